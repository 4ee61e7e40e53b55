use helm_values::{JsonSchemaGenerator, RepositoryMappings, SchemaIo};
use serde::Deserialize;
use vfs::VfsPath;

use crate::error::{CliError, CliResult};

pub const DEFAULT_CONFIG_FILE: &str = "helm-values.yaml";
const ENV_PREFIX: &str = "HELM_VALUES";

/// Repository mappings and publication target of a chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub repository_mappings: RepositoryMappings,
    #[serde(default)]
    pub publication_repository: Option<String>,
}

impl Config {
    /// Load the configuration in `file`.
    ///
    /// A missing file yields the default configuration unless it is `required`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(io: &SchemaIo, file: &VfsPath, required: bool) -> CliResult<Self> {
        if !required && !file.is_file()? {
            tracing::debug!(path = file.as_str(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        io.read_yaml::<Self>(file).map_err(|source| CliError::Config {
            path: file.as_str().to_string(),
            source,
        })
    }

    /// Override repository credentials from `HELM_VALUES_<KEY>_USERNAME` and
    /// `HELM_VALUES_<KEY>_PASSWORD`.
    #[must_use]
    pub fn with_env_credentials(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for (key, repository) in &mut self.repository_mappings {
            let prefix = credentials_env_prefix(key);
            if let Some(username) = lookup(&format!("{prefix}_USERNAME")) {
                repository.username = Some(username);
            }
            if let Some(password) = lookup(&format!("{prefix}_PASSWORD")) {
                repository.password = Some(password);
            }
        }
        self
    }

    #[must_use]
    pub fn generator(&self) -> JsonSchemaGenerator {
        let generator = JsonSchemaGenerator::new(self.repository_mappings.clone());
        match &self.publication_repository {
            Some(key) => generator.with_publication_repository(key),
            None => generator,
        }
    }
}

/// `@my-apps` → `HELM_VALUES_MY_APPS`
#[must_use]
pub fn credentials_env_prefix(key: &str) -> String {
    let key: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}_{}", key.trim_matches('_'))
}
