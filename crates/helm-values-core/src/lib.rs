mod chart;
mod error;
mod fallback;
mod io;
mod locator;
pub mod node;
mod patch;
mod ref_mapping;
mod repository;

pub use chart::{Chart, ChartDependency, ChartDependencyImport};
pub use error::{Error, Result};
pub use fallback::fallback_schema;
pub use io::{SchemaIo, recreate_dir, write_bytes};
pub use locator::{BuildDirSchemaLocator, OutputDirSchemaLocator, SchemaLocator};
pub use node::ObjectNodeExt;
pub use patch::{JsonPatch, apply_json_patch, load_json_patch};
pub use ref_mapping::{RefMapping, update_references};
pub use repository::{JsonSchemaRepository, RepositoryMappings};

pub const HELM_CHART_FILE: &str = "Chart.yaml";
pub const HELM_VALUES_FILE: &str = "values.yaml";
pub const HELM_SCHEMA_FILE: &str = "values.schema.json";
pub const VALUES_SCHEMA_FILE: &str = "values.schema.json";
pub const GLOBAL_VALUES_SCHEMA_FILE: &str = "global-values.schema.json";
pub const AGGREGATED_SCHEMA_FILE: &str = "aggregated-values.schema.json";
pub const PATCH_VALUES_SCHEMA_FILE: &str = "values.schema.patch.json";
pub const PATCH_AGGREGATED_SCHEMA_FILE: &str = "aggregated-values.schema.patch.json";

/// Working directories below the output directory.
pub const DOWNLOAD_DIR: &str = "downloads";
pub const EXTRACT_DIR: &str = "extract";
pub const GENERATED_DIR: &str = "generated";

/// Reserved namespaces below `$defs` of an aggregated schema.
pub const DOWNLOADS: &str = "downloads";
pub const EXTRACTS: &str = "extracts";
pub const LOCAL: &str = "local";

pub const SCHEMA_VERSION: &str = "https://json-schema.org/draft/2020-12/schema";
pub const GENERATOR_ID: &str = "helm-values";
