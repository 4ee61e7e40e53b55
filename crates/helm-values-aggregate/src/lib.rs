//! Aggregation of the values schemas of a chart and all of its dependencies
//! into one self-contained schema.
//!
//! Dependency schemas come from three sources, embedded below reserved
//! namespaces of `$defs`:
//!
//! - `downloads`: schemas downloaded from a mapped schema repository,
//! - `extracts`: schemas extracted from packaged chart archives,
//! - `local`: the chart's own schema and aggregated schemas of local dependencies.

mod cleanup;
mod compose;
mod downloaded;
mod embed;
mod extracted;
mod local;
mod required;

pub use cleanup::remove_dangling_refs;
pub use required::{RequiredPropertyCleaner, discard_required_properties};

use helm_values_chart::ExtractedValuesAggregator;
use helm_values_core::{
    AGGREGATED_SCHEMA_FILE, BuildDirSchemaLocator, Chart, Error, JsonPatch, ObjectNodeExt,
    SchemaIo, SchemaLocator, apply_json_patch,
};
use helm_values_gen::JsonSchemaGenerator;
use serde_json::Value;
use vfs::VfsPath;

use crate::embed::SchemaEmbedder;

pub struct JsonSchemaAggregator {
    generator: JsonSchemaGenerator,
    chart_dir: VfsPath,
    download_dir: VfsPath,
    extract_dir: VfsPath,
    locator: Box<dyn SchemaLocator>,
    io: SchemaIo,
}

impl std::fmt::Debug for JsonSchemaAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaAggregator")
            .field("generator", &self.generator)
            .field("chart_dir", &self.chart_dir.as_str())
            .field("download_dir", &self.download_dir.as_str())
            .field("extract_dir", &self.extract_dir.as_str())
            .field("io", &self.io)
            .finish_non_exhaustive()
    }
}

impl JsonSchemaAggregator {
    /// Aggregator for the chart in `chart_dir`, reading the results of a
    /// previous download into `download_dir` and extraction into `extract_dir`.
    ///
    /// Aggregated schemas of local dependencies are looked up with a
    /// [`BuildDirSchemaLocator`] by default.
    #[must_use]
    pub fn new(
        generator: JsonSchemaGenerator,
        chart_dir: VfsPath,
        download_dir: VfsPath,
        extract_dir: VfsPath,
        io: SchemaIo,
    ) -> Self {
        Self {
            generator,
            locator: Box::new(BuildDirSchemaLocator::new(chart_dir.clone())),
            chart_dir,
            download_dir,
            extract_dir,
            io,
        }
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl SchemaLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    /// Build the aggregated schema of `chart`.
    ///
    /// `values_patch` is applied to the generated values schema the aggregate
    /// starts from, `aggregated_patch` to the final result.
    ///
    /// # Errors
    ///
    /// Returns an error if the publication repository is not mapped, a
    /// working directory cannot be read or a patch cannot be applied.
    /// Missing or unreadable schema files are skipped with a warning.
    pub fn aggregate(
        &self,
        chart: &Chart,
        values_patch: Option<&JsonPatch>,
        aggregated_patch: Option<&JsonPatch>,
    ) -> Result<Value, Error> {
        let mut schema = self.generator.generate_values_json_schema(chart, values_patch)?;
        {
            let root = schema.as_object_node();
            root.insert(
                "$id".to_string(),
                Value::String(format!(
                    "{}/{}/{AGGREGATED_SCHEMA_FILE}",
                    chart.name, chart.version
                )),
            );
            root.insert(
                "title".to_string(),
                Value::String(format!(
                    "Aggregated configuration for chart {}",
                    chart.coordinates()
                )),
            );
        }
        compose::detach_global_file_ref(&mut schema);

        let embedder = SchemaEmbedder::new(&self.io);
        self.aggregate_downloaded(chart, &mut schema, &embedder)?;
        self.aggregate_extracted(chart, &mut schema, &embedder)?;
        self.aggregate_local(chart, &mut schema, &embedder)?;

        let dangling = remove_dangling_refs(&mut schema);
        let values = ExtractedValuesAggregator::new(self.extract_dir.clone(), self.io);
        let discarded =
            RequiredPropertyCleaner::new(values).discard_required_properties_for(chart, &mut schema)?;
        compose::rebuild_global(&mut schema, chart);

        let root = schema.as_object_node();
        root.insert("additionalProperties".to_string(), Value::Bool(false));
        root.insert("unevaluatedProperties".to_string(), Value::Bool(false));

        apply_json_patch(&mut schema, aggregated_patch)?;
        tracing::info!(
            chart = %chart.coordinates(),
            dangling,
            discarded,
            "aggregated values schema"
        );
        Ok(schema)
    }
}
