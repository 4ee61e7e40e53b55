//! Download, extract, generate, aggregate and publish the JSON schemas of
//! Helm chart values.

pub mod logging;

pub use helm_values_aggregate as aggregate;
pub use helm_values_chart as chart;
pub use helm_values_core as common;
pub use helm_values_gen as generate;
pub use helm_values_remote as remote;

pub use helm_values_aggregate::JsonSchemaAggregator;
pub use helm_values_chart::{ExtractedValuesAggregator, SchemaExtractor};
pub use helm_values_core::{
    Chart, ChartDependency, Error, JsonSchemaRepository, RepositoryMappings, SchemaIo,
};
pub use helm_values_gen::JsonSchemaGenerator;
pub use helm_values_remote::{JsonSchemaPublisher, SchemaDownloader};
