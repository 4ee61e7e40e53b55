use helm_values_core::{
    Chart, Error, HELM_SCHEMA_FILE, LOCAL, ObjectNodeExt,
    node::{ALL_OF, PROPERTIES, REF},
};
use serde_json::{Value, json};

use crate::{JsonSchemaAggregator, compose, embed::SchemaEmbedder};

impl JsonSchemaAggregator {
    /// Embed the hand-written schema of the chart itself and the aggregated
    /// schemas of dependencies stored next to it.
    pub(crate) fn aggregate_local(
        &self,
        chart: &Chart,
        schema: &mut Value,
        embedder: &SchemaEmbedder<'_>,
    ) -> Result<(), Error> {
        if self.chart_dir.join(HELM_SCHEMA_FILE)?.is_file()?
            && let Some(reference) =
                embedder.embed(schema, &[LOCAL], &self.chart_dir, HELM_SCHEMA_FILE)?
        {
            schema
                .array_or_create(ALL_OF)
                .push(json!({ REF: reference.clone() }));
            compose::expose_properties(schema, &reference, &[]);
            let global_ref = format!("{reference}/{PROPERTIES}/{}", compose::GLOBAL);
            if compose::resolves(schema, &global_ref) {
                compose::add_global_ref(schema, global_ref);
            }
        }

        for dependency in chart.dependencies.iter().filter(|d| d.is_stored_locally()) {
            let path = self.locator.aggregated_schema_for(dependency)?;
            if !path.is_file()? {
                tracing::warn!(
                    dependency = %dependency.name,
                    path = path.as_str(),
                    "aggregated schema of local dependency not found, aggregate it first"
                );
                continue;
            }
            let file = path.filename();
            let namespace = [LOCAL, dependency.name.as_str()];
            let Some(reference) = embedder.embed(schema, &namespace, &path.parent(), &file)? else {
                continue;
            };

            let alias = dependency.alias_or_name();
            schema
                .object_path_or_create([PROPERTIES, alias])
                .insert(REF.to_string(), Value::String(reference.clone()));

            let global_ref = format!("{reference}/{PROPERTIES}/{}", compose::GLOBAL);
            if compose::resolves(schema, &global_ref) {
                compose::relax_global(schema, &global_ref);
                compose::add_global_ref(schema, global_ref);
            }
            compose::add_imports(schema, dependency, &reference, &[]);
        }
        Ok(())
    }
}
