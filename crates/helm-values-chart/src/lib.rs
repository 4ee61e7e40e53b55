//! Schemas and default values of chart dependencies packaged below `charts/`.

mod extract;
mod values;

pub use extract::SchemaExtractor;
pub use values::{ExtractedValuesAggregator, merge_prefer_left};
