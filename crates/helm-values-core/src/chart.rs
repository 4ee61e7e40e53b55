use serde::{Deserialize, Serialize};
use vfs::VfsPath;

use crate::{Error, HELM_CHART_FILE, JsonSchemaRepository, RepositoryMappings};

const LOCAL_REPOSITORY_PREFIX: &str = "file://";

/// A parsed `Chart.yaml` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

impl Chart {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            api_version: "v2".to_string(),
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: ChartDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Parse a chart manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid chart manifest.
    pub fn from_yaml(raw: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Load `Chart.yaml` from a chart directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingChartManifest`] if the manifest does not exist.
    pub fn load(chart_dir: &VfsPath) -> Result<Self, Error> {
        let manifest = chart_dir.join(HELM_CHART_FILE)?;
        if !manifest.is_file()? {
            return Err(Error::MissingChartManifest(manifest.as_str().to_string()));
        }
        Self::from_yaml(&manifest.read_to_string()?)
    }

    /// `name:version`, used in titles and log messages.
    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}

/// An entry of the `dependencies` list of a chart manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDependency {
    pub name: String,
    pub version: Option<String>,
    pub repository: Option<String>,
    pub alias: Option<String>,
    pub condition: Option<String>,
    #[serde(default, rename = "import-values")]
    pub import_values: Vec<ChartDependencyImport>,
}

impl ChartDependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn with_import(mut self, import: ChartDependencyImport) -> Self {
        self.import_values.push(import);
        self
    }

    /// Key under which the values of this dependency live in the parent chart.
    #[must_use]
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    #[must_use]
    pub fn is_stored_locally(&self) -> bool {
        self.repository
            .as_deref()
            .is_some_and(|r| r.starts_with(LOCAL_REPOSITORY_PREFIX))
    }

    /// Path of a local dependency relative to the parent chart directory.
    #[must_use]
    pub fn local_path(&self) -> Option<&str> {
        self.repository
            .as_deref()
            .and_then(|r| r.strip_prefix(LOCAL_REPOSITORY_PREFIX))
    }

    /// Repository of this dependency if its key is part of `mappings`.
    ///
    /// Local dependencies never resolve to a mapped repository.
    #[must_use]
    pub fn mapped_repository<'a>(
        &self,
        mappings: &'a RepositoryMappings,
    ) -> Option<&'a JsonSchemaRepository> {
        if self.is_stored_locally() {
            return None;
        }
        mappings.get(self.repository.as_deref()?)
    }

    /// Dot paths listed in `condition`.
    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.condition
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// `repository/name:version`, omitting the parts that are not set.
    #[must_use]
    pub fn coordinates(&self) -> String {
        let mut out = String::new();
        if let Some(repository) = self.repository.as_deref().filter(|r| !r.is_empty()) {
            out.push_str(repository);
            out.push('/');
        }
        out.push_str(&self.name);
        if let Some(version) = &self.version {
            out.push(':');
            out.push_str(version);
        }
        out
    }
}

/// An `import-values` entry.
///
/// The short form `- data` is equivalent to `{child: exports.data, parent: data}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawImport")]
pub struct ChartDependencyImport {
    pub child: String,
    pub parent: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawImport {
    Short(String),
    Explicit { child: String, parent: String },
}

impl From<RawImport> for ChartDependencyImport {
    fn from(raw: RawImport) -> Self {
        match raw {
            RawImport::Short(key) => Self {
                child: format!("exports.{key}"),
                parent: key,
            },
            RawImport::Explicit { child, parent } => Self { child, parent },
        }
    }
}

impl ChartDependencyImport {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }

    #[must_use]
    pub fn child_path(&self) -> Vec<&str> {
        dot_path(&self.child)
    }

    /// Segments of `parent`; empty when the import targets the root (`.`).
    #[must_use]
    pub fn parent_path(&self) -> Vec<&str> {
        dot_path(&self.parent)
    }
}

fn dot_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre;
    use indoc::indoc;
    use test_util::prelude::*;

    #[test]
    fn parses_manifest_with_dependencies() -> eyre::Result<()> {
        let chart = Chart::from_yaml(indoc! {r#"
            apiVersion: v2
            name: helm-chart
            version: 0.1.0
            dependencies:
              - name: external-json-schema
                version: 0.2.0
                repository: "@apps"
                alias: ext
                condition: ext.enabled, global.ext.enabled
                import-values:
                  - data
                  - child: exports.other
                    parent: imported
              - name: sibling
                version: 0.1.0
                repository: file://../sibling
        "#})?;

        assert_that!(
            &chart,
            matches_pattern!(Chart {
                name: eq("helm-chart"),
                version: eq("0.1.0"),
                dependencies: len(eq(2)),
                ..
            })
        );

        let ext = &chart.dependencies[0];
        assert_eq!(ext.alias_or_name(), "ext");
        assert!(!ext.is_stored_locally());
        assert_eq!(
            ext.conditions().collect::<Vec<_>>(),
            vec!["ext.enabled", "global.ext.enabled"]
        );
        sim_assert_eq!(
            ext.import_values,
            vec![
                ChartDependencyImport::new("exports.data", "data"),
                ChartDependencyImport::new("exports.other", "imported"),
            ]
        );
        assert_eq!(ext.coordinates(), "@apps/external-json-schema:0.2.0");

        let sibling = &chart.dependencies[1];
        assert!(sibling.is_stored_locally());
        assert_eq!(sibling.local_path(), Some("../sibling"));
        assert_eq!(sibling.alias_or_name(), "sibling");
        Ok(())
    }

    #[test]
    fn local_dependencies_never_resolve_to_mapped_repository() {
        let mut mappings = RepositoryMappings::new();
        mappings.insert(
            "file://../sibling".to_string(),
            JsonSchemaRepository::new("http://localhost/apps"),
        );
        mappings.insert(
            "@apps".to_string(),
            JsonSchemaRepository::new("http://localhost/apps"),
        );

        let local = ChartDependency::new("sibling").with_repository("file://../sibling");
        assert!(local.mapped_repository(&mappings).is_none());

        let remote = ChartDependency::new("remote").with_repository("@apps");
        assert!(remote.mapped_repository(&mappings).is_some());

        let third_party = ChartDependency::new("redis");
        assert!(third_party.mapped_repository(&mappings).is_none());
    }

    #[test]
    fn load_reports_missing_manifest() -> eyre::Result<()> {
        let root = vfs::VfsPath::new(vfs::MemoryFS::new());
        let err = Chart::load(&root.join("chart")?).unwrap_err();
        assert_that!(err.to_string(), contains_substring("Chart.yaml"));
        Ok(())
    }
}
