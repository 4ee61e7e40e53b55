use helm_values_core::{
    Chart, DOWNLOADS, Error, RefMapping,
    node::{self, DEFS},
    update_references,
};
use serde_json::Value;

use crate::{JsonSchemaAggregator, compose, embed::SchemaEmbedder};

impl JsonSchemaAggregator {
    /// Embed the downloaded schemas of mapped dependencies below
    /// `$defs/downloads/<alias>` and point the generated references there.
    pub(crate) fn aggregate_downloaded(
        &self,
        chart: &Chart,
        schema: &mut Value,
        embedder: &SchemaEmbedder<'_>,
    ) -> Result<(), Error> {
        let mut mappings = Vec::new();
        for (dependency, repository) in self.generator.mapped_dependencies(chart) {
            let alias = dependency.alias_or_name();
            let dir = self.download_dir.join(alias)?;
            let namespace = [DOWNLOADS, alias];

            let values_ref =
                embedder.embed(schema, &namespace, &dir, &repository.values_schema_file)?;
            let global_ref =
                embedder.embed(schema, &namespace, &dir, &repository.global_values_schema_file)?;

            let base = self.generator.dependency_ref_base(chart, dependency, repository)?;
            mappings.push(RefMapping::new(
                base,
                format!("#{}", node::pointer(&[DEFS, DOWNLOADS, alias])),
            ));

            if let Some(global_ref) = global_ref {
                compose::add_global_ref(schema, global_ref);
            }
            if let Some(values_ref) = values_ref {
                compose::add_imports(schema, dependency, &values_ref, &[]);
            }
        }

        let updated = update_references(schema, &mappings);
        tracing::debug!(updated, "mapped references to downloaded schemas");
        Ok(())
    }
}
