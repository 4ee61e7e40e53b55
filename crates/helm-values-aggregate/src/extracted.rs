use helm_values_core::{
    Chart, ChartDependency, EXTRACTS, Error, HELM_CHART_FILE, HELM_SCHEMA_FILE,
    ObjectNodeExt,
    node::{PROPERTIES, REF},
};
use serde_json::Value;
use vfs::VfsPath;

use crate::{JsonSchemaAggregator, compose, embed::SchemaEmbedder};

impl JsonSchemaAggregator {
    /// Embed the schemas extracted from chart archives of dependencies
    /// without mapped repository, recursing into their own dependencies.
    pub(crate) fn aggregate_extracted(
        &self,
        chart: &Chart,
        schema: &mut Value,
        embedder: &SchemaEmbedder<'_>,
    ) -> Result<(), Error> {
        for dependency in &chart.dependencies {
            if dependency.version.is_none()
                || dependency.is_stored_locally()
                || dependency.mapped_repository(self.generator.mappings()).is_some()
            {
                continue;
            }
            self.aggregate_extracted_dependency(
                schema,
                embedder,
                dependency,
                &self.extract_dir,
                &[],
                &[],
            )?;
        }
        Ok(())
    }

    fn aggregate_extracted_dependency(
        &self,
        schema: &mut Value,
        embedder: &SchemaEmbedder<'_>,
        dependency: &ChartDependency,
        parent_dir: &VfsPath,
        parent_chain: &[&str],
        parent_properties: &[&str],
    ) -> Result<(), Error> {
        let alias = dependency.alias_or_name();
        let dir = parent_dir.join(alias)?;

        let mut chain = parent_chain.to_vec();
        chain.push(alias);
        let mut namespace = vec![EXTRACTS];
        namespace.extend(&chain);
        let mut properties = parent_properties.to_vec();
        properties.extend([PROPERTIES, alias]);

        if let Some(reference) = embedder.embed(schema, &namespace, &dir, HELM_SCHEMA_FILE)? {
            let slot = schema.object_path_or_create(properties.iter().copied());
            slot.insert(REF.to_string(), Value::String(reference.clone()));
            slot.entry("title")
                .or_insert_with(|| Value::String(format!("Configuration of dependency {alias}")));
            slot.entry("description").or_insert_with(|| {
                Value::String(format!(
                    "Schema extracted from the chart archive of {}",
                    dependency.coordinates()
                ))
            });

            let global_ref = format!("{reference}/{PROPERTIES}/{}", compose::GLOBAL);
            if compose::resolves(schema, &global_ref) {
                compose::relax_global(schema, &global_ref);
                compose::add_global_ref(schema, global_ref);
            }
            compose::add_imports(schema, dependency, &reference, parent_properties);
        }

        if !dir.join(HELM_CHART_FILE)?.is_file()? {
            return Ok(());
        }
        let nested = match Chart::load(&dir) {
            Ok(nested) => nested,
            Err(err) => {
                tracing::warn!(dependency = alias, error = %err, "cannot read extracted chart manifest");
                return Ok(());
            }
        };
        for nested_dependency in &nested.dependencies {
            if nested_dependency.version.is_none() {
                continue;
            }
            self.aggregate_extracted_dependency(
                schema,
                embedder,
                nested_dependency,
                &dir,
                &chain,
                &properties,
            )?;
        }
        Ok(())
    }
}
