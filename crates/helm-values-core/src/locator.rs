use vfs::VfsPath;

use crate::{AGGREGATED_SCHEMA_FILE, ChartDependency, Error};

/// Locates the aggregated schema previously produced for a local dependency.
pub trait SchemaLocator {
    /// # Errors
    ///
    /// Returns an error if `dependency` cannot be mapped onto a path.
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> Result<VfsPath, Error>;
}

/// Build layout: `<chart-dir>/<dep-path>/build/helm-values/aggregated-values.schema.json`.
#[derive(Debug, Clone)]
pub struct BuildDirSchemaLocator {
    chart_dir: VfsPath,
    build_dir: String,
}

impl BuildDirSchemaLocator {
    pub const DEFAULT_BUILD_DIR: &'static str = "build/helm-values";

    #[must_use]
    pub fn new(chart_dir: VfsPath) -> Self {
        Self {
            chart_dir,
            build_dir: Self::DEFAULT_BUILD_DIR.to_string(),
        }
    }

    /// Output directory of sibling charts, relative to their chart directory.
    #[must_use]
    pub fn with_build_dir(mut self, build_dir: impl Into<String>) -> Self {
        self.build_dir = build_dir.into();
        self
    }
}

impl SchemaLocator for BuildDirSchemaLocator {
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> Result<VfsPath, Error> {
        let dep_dir = dependency.local_path().unwrap_or(&dependency.name);
        let path = self
            .chart_dir
            .join(dep_dir)?
            .join(&self.build_dir)?
            .join(AGGREGATED_SCHEMA_FILE)?;
        Ok(path)
    }
}

/// Shared output layout: `<output-root>/<dep-name>/aggregated-values.schema.json`.
#[derive(Debug, Clone)]
pub struct OutputDirSchemaLocator {
    output_root: VfsPath,
}

impl OutputDirSchemaLocator {
    #[must_use]
    pub fn new(output_root: VfsPath) -> Self {
        Self { output_root }
    }
}

impl SchemaLocator for OutputDirSchemaLocator {
    fn aggregated_schema_for(&self, dependency: &ChartDependency) -> Result<VfsPath, Error> {
        Ok(self
            .output_root
            .join(&dependency.name)?
            .join(AGGREGATED_SCHEMA_FILE)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre;
    use test_util::prelude::*;

    #[test]
    fn locates_aggregated_schemas() -> eyre::Result<()> {
        let root = VfsPath::new(vfs::MemoryFS::new());
        let dependency = ChartDependency::new("sibling")
            .with_version("0.1.0")
            .with_repository("file://../sibling");

        let build = BuildDirSchemaLocator::new(root.join("charts/app")?);
        assert_that!(
            &build.aggregated_schema_for(&dependency)?,
            matches_path("/charts/sibling/build/helm-values/aggregated-values.schema.json")
        );

        let build = build.with_build_dir("out");
        assert_that!(
            &build.aggregated_schema_for(&dependency)?,
            matches_path("/charts/sibling/out/aggregated-values.schema.json")
        );

        let output = OutputDirSchemaLocator::new(root.join("schemas")?);
        assert_that!(
            &output.aggregated_schema_for(&dependency)?,
            matches_path("/schemas/sibling/aggregated-values.schema.json")
        );
        Ok(())
    }
}
