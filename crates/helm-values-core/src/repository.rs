use std::collections::BTreeMap;

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{GLOBAL_VALUES_SCHEMA_FILE, VALUES_SCHEMA_FILE};

/// Repository mappings keyed by the symbolic repository name used in `Chart.yaml` (e.g. `@apps`).
pub type RepositoryMappings = BTreeMap<String, JsonSchemaRepository>;

/// A remote repository hosting JSON schemas of charts under `{baseUri}/{name}/{version}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonSchemaRepository {
    #[serde(deserialize_with = "trimmed_base_uri")]
    pub base_uri: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_values_schema_file")]
    pub values_schema_file: String,
    #[serde(default = "default_global_values_schema_file")]
    pub global_values_schema_file: String,
}

fn default_values_schema_file() -> String {
    VALUES_SCHEMA_FILE.to_string()
}

fn default_global_values_schema_file() -> String {
    GLOBAL_VALUES_SCHEMA_FILE.to_string()
}

fn trimmed_base_uri<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(raw.trim_end_matches('/').to_string())
}

impl JsonSchemaRepository {
    pub fn new(base_uri: impl Into<String>) -> Self {
        let base_uri: String = base_uri.into();
        Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            username: None,
            password: None,
            values_schema_file: default_values_schema_file(),
            global_values_schema_file: default_global_values_schema_file(),
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_values_schema_file(mut self, file: impl Into<String>) -> Self {
        self.values_schema_file = file.into();
        self
    }

    #[must_use]
    pub fn with_global_values_schema_file(mut self, file: impl Into<String>) -> Self {
        self.global_values_schema_file = file.into();
        self
    }

    /// Base URI of the folder holding the schemas of one chart version.
    #[must_use]
    pub fn chart_uri(&self, name: &str, version: &str) -> String {
        format!("{}/{name}/{version}", self.base_uri)
    }

    #[must_use]
    pub fn schema_uri(&self, name: &str, version: &str, file: &str) -> String {
        format!("{}/{file}", self.chart_uri(name, version))
    }

    /// Both schema files published for every chart, values schema first.
    #[must_use]
    pub fn schema_files(&self) -> [&str; 2] {
        [
            self.values_schema_file.as_str(),
            self.global_values_schema_file.as_str(),
        ]
    }

    /// Value of the `Authorization` header, if credentials are configured.
    #[must_use]
    pub fn basic_auth(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or_default();
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        Some(format!("Basic {token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre;
    use indoc::indoc;

    #[test]
    fn deserializes_with_defaults_and_trims_base_uri() -> eyre::Result<()> {
        let mappings: RepositoryMappings = serde_yaml::from_str(indoc! {r#"
            "@apps":
              baseUri: http://localhost:1980/apps/
            "@infra":
              baseUri: http://localhost:1980/infra
              valuesSchemaFile: schema.json
              globalValuesSchemaFile: global.json
        "#})?;

        let apps = &mappings["@apps"];
        assert_eq!(apps.base_uri, "http://localhost:1980/apps");
        assert_eq!(apps.values_schema_file, "values.schema.json");
        assert_eq!(apps.global_values_schema_file, "global-values.schema.json");
        assert_eq!(
            apps.schema_uri("chart", "0.1.0", &apps.values_schema_file),
            "http://localhost:1980/apps/chart/0.1.0/values.schema.json"
        );

        let infra = &mappings["@infra"];
        assert_eq!(infra.schema_files(), ["schema.json", "global.json"]);
        Ok(())
    }

    #[test]
    fn basic_auth_header() {
        let repository = JsonSchemaRepository::new("http://localhost");
        assert_eq!(repository.basic_auth(), None);

        let repository = repository.with_credentials("user", "pass");
        assert_eq!(repository.basic_auth().as_deref(), Some("Basic dXNlcjpwYXNz"));
    }
}
