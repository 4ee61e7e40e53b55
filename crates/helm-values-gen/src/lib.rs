use helm_values_core::{
    Chart, ChartDependency, Error, GLOBAL_VALUES_SCHEMA_FILE, JsonPatch, JsonSchemaRepository,
    ObjectNodeExt, RepositoryMappings, SCHEMA_VERSION, VALUES_SCHEMA_FILE, apply_json_patch,
    node::{ALL_OF, PROPERTIES, REF},
};
use serde_json::{Map, Value, json};
use url::Url;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Builds the publishable values schemas of a chart.
///
/// Dependencies hosted in a mapped repository are referenced by URI, relative
/// to the publication repository where possible. Dependencies without mapped
/// repository only contribute their condition properties.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaGenerator {
    mappings: RepositoryMappings,
    publication_repository: Option<String>,
}

impl JsonSchemaGenerator {
    #[must_use]
    pub fn new(mappings: RepositoryMappings) -> Self {
        Self {
            mappings,
            publication_repository: None,
        }
    }

    /// Key in the repository mappings of the repository the schemas are published to.
    #[must_use]
    pub fn with_publication_repository(mut self, key: impl Into<String>) -> Self {
        self.publication_repository = Some(key.into());
        self
    }

    #[must_use]
    pub fn mappings(&self) -> &RepositoryMappings {
        &self.mappings
    }

    /// The publication repository, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryNotFound`] if the configured key is not mapped.
    pub fn publication_repository(&self) -> Result<Option<&JsonSchemaRepository>, Error> {
        match &self.publication_repository {
            None => Ok(None),
            Some(key) => self
                .mappings
                .get(key)
                .map(Some)
                .ok_or_else(|| Error::RepositoryNotFound(key.clone())),
        }
    }

    /// The schema for the `values.yaml` of `chart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the publication repository is not mapped or the
    /// patch cannot be applied.
    pub fn generate_values_json_schema(
        &self,
        chart: &Chart,
        patch: Option<&JsonPatch>,
    ) -> Result<Value, Error> {
        let publication = self.publication_repository()?;
        let (values_file, global_file) = schema_files(publication);

        let mut schema = json!({
            "$schema": SCHEMA_VERSION,
            "$id": self.chart_schema_id(chart, publication, values_file),
            "title": format!("Configuration for chart {}", chart.coordinates()),
            "type": "object",
            "properties": {
                "global": {
                    "$ref": global_file,
                },
            },
        });

        for (dependency, repository) in self.mapped_dependencies(chart) {
            let reference = format!(
                "{}/{}",
                self.dependency_ref_base(chart, dependency, repository)?,
                repository.values_schema_file
            );
            tracing::debug!(
                dependency = dependency.alias_or_name(),
                %reference,
                "reference dependency values schema"
            );
            schema
                .object_path_or_create([PROPERTIES, dependency.alias_or_name()])
                .insert(REF.to_string(), Value::String(reference));
        }

        for dependency in &chart.dependencies {
            for condition in dependency.conditions() {
                add_condition_property(&mut schema, dependency, condition);
            }
        }

        apply_json_patch(&mut schema, patch)?;
        Ok(schema)
    }

    /// The schema for the `global` section of the values of `chart`.
    ///
    /// # Errors
    ///
    /// Returns an error if the publication repository is not mapped or the
    /// patch cannot be applied.
    pub fn generate_global_values_json_schema(
        &self,
        chart: &Chart,
        patch: Option<&JsonPatch>,
    ) -> Result<Value, Error> {
        let publication = self.publication_repository()?;
        let (_, global_file) = schema_files(publication);

        let mut schema = json!({
            "$schema": SCHEMA_VERSION,
            "$id": self.chart_schema_id(chart, publication, global_file),
            "title": format!("Configuration of global values for chart {}", chart.coordinates()),
            "type": "object",
        });

        let mut all_of = Vec::new();
        for (dependency, repository) in self.mapped_dependencies(chart) {
            let reference = format!(
                "{}/{}",
                self.dependency_ref_base(chart, dependency, repository)?,
                repository.global_values_schema_file
            );
            all_of.push(json!({ REF: reference }));
        }
        if !all_of.is_empty() {
            schema.as_object_node().insert(ALL_OF.to_string(), Value::Array(all_of));
        }

        apply_json_patch(&mut schema, patch)?;
        Ok(schema)
    }

    /// Dependencies with a version whose repository is mapped, in manifest order.
    pub fn mapped_dependencies<'a>(
        &'a self,
        chart: &'a Chart,
    ) -> impl Iterator<Item = (&'a ChartDependency, &'a JsonSchemaRepository)> + 'a {
        chart.dependencies.iter().filter_map(|dependency| {
            dependency.version.as_ref()?;
            let repository = dependency.mapped_repository(&self.mappings)?;
            Some((dependency, repository))
        })
    }

    /// URI of the folder holding the schemas of `dependency`, as referenced
    /// from the generated schemas of `chart`.
    ///
    /// Relative when the dependency is hosted on the same host as the
    /// publication repository, absolute otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the publication repository is not mapped.
    pub fn dependency_ref_base(
        &self,
        chart: &Chart,
        dependency: &ChartDependency,
        repository: &JsonSchemaRepository,
    ) -> Result<String, Error> {
        let version = dependency.version.as_deref().unwrap_or_default();
        let absolute = repository.chart_uri(&dependency.name, version);
        let Some(publication) = self.publication_repository()? else {
            return Ok(absolute);
        };

        if publication.base_uri == repository.base_uri {
            return Ok(format!("../../{}/{version}", dependency.name));
        }

        let (Ok(from), Ok(to)) = (
            Url::parse(&publication.chart_uri(&chart.name, &chart.version)),
            Url::parse(&absolute),
        ) else {
            return Ok(absolute);
        };
        if from.scheme() != to.scheme()
            || from.host_str() != to.host_str()
            || from.port_or_known_default() != to.port_or_known_default()
        {
            return Ok(absolute);
        }

        let from: Vec<&str> = from.path().split('/').filter(|s| !s.is_empty()).collect();
        let to: Vec<&str> = to.path().split('/').filter(|s| !s.is_empty()).collect();
        let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
        let mut parts = vec![".."; from.len() - common];
        parts.extend(&to[common..]);
        Ok(parts.join("/"))
    }

    fn chart_schema_id(
        &self,
        chart: &Chart,
        publication: Option<&JsonSchemaRepository>,
        file: &str,
    ) -> String {
        match publication {
            Some(repository) => repository.schema_uri(&chart.name, &chart.version, file),
            None => format!("{}/{}/{file}", chart.name, chart.version),
        }
    }
}

fn schema_files(publication: Option<&JsonSchemaRepository>) -> (&str, &str) {
    match publication {
        Some(repository) => (
            repository.values_schema_file.as_str(),
            repository.global_values_schema_file.as_str(),
        ),
        None => (VALUES_SCHEMA_FILE, GLOBAL_VALUES_SCHEMA_FILE),
    }
}

/// Add a boolean property at the dot path `condition`.
fn add_condition_property(schema: &mut Value, dependency: &ChartDependency, condition: &str) {
    let alias = dependency.alias_or_name();
    let title = format!("Enable {alias} dependency ({})", dependency.coordinates());

    let mut node = schema.as_object_node();
    for segment in condition.split('.').filter(|s| !s.is_empty()) {
        node = node.object_path_or_create([PROPERTIES, segment]);
    }

    let mut property = Map::new();
    property.insert("type".to_string(), json!("boolean"));
    property.insert("title".to_string(), Value::String(title));
    property.insert(
        "description".to_string(),
        Value::String(format!(
            "Whether the {alias} dependency is installed. Evaluated by Helm as condition `{condition}`."
        )),
    );
    for (key, value) in property {
        node.insert(key, value);
    }
}
