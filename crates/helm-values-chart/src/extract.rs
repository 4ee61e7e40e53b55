use std::io::Read;

use flate2::read::GzDecoder;
use helm_values_core::{
    Chart, ChartDependency, Error, HELM_CHART_FILE, HELM_SCHEMA_FILE, HELM_VALUES_FILE, SchemaIo,
    fallback_schema, recreate_dir, write_bytes,
};
use tar::Archive;
use vfs::VfsPath;

const CHARTS_DIR: &str = "charts";

/// A dependency chart, either packaged or unpacked below `charts/`.
struct Located {
    /// Root directory of the chart.
    root: VfsPath,
    /// Path of the first embedded schema, relative to `root`.
    schema: Option<String>,
    origin: String,
}

/// Extracts values schemas embedded in packaged dependencies.
///
/// For every dependency with a version, `<charts-dir>/<name>-<version>.tgz`
/// is opened and its values schema, `Chart.yaml` and `values.yaml` are
/// written to `<extract-dir>/<alias-or-name>/`. Dependencies of the extracted
/// chart are handled the same way, one directory level deeper.
#[derive(Debug, Clone)]
pub struct SchemaExtractor {
    charts_dir: VfsPath,
    extract_dir: VfsPath,
    io: SchemaIo,
}

impl SchemaExtractor {
    #[must_use]
    pub fn new(charts_dir: VfsPath, extract_dir: VfsPath, io: SchemaIo) -> Self {
        Self {
            charts_dir,
            extract_dir,
            io,
        }
    }

    /// Replace the content of the extract directory with the schemas of all
    /// packaged dependencies of `chart`.
    ///
    /// Missing archives and archives without schema yield a fallback schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the extract directory cannot be written.
    pub fn extract(&self, chart: &Chart) -> Result<(), Error> {
        recreate_dir(&self.extract_dir)?;
        self.extract_dependencies(&self.charts_dir, &chart.dependencies, &self.extract_dir)
    }

    fn extract_dependencies(
        &self,
        charts_dir: &VfsPath,
        dependencies: &[ChartDependency],
        target_dir: &VfsPath,
    ) -> Result<(), Error> {
        for dependency in dependencies {
            let Some(version) = dependency.version.as_deref() else {
                continue;
            };
            let target = target_dir.join(dependency.alias_or_name())?;
            match locate(charts_dir, &dependency.name, version) {
                Ok(Some(located)) => self.extract_located(dependency, &located, &target)?,
                Ok(None) => self.write_fallback(
                    dependency,
                    &target,
                    &format!(
                        "archive {name}-{version}.tgz not found in {dir}",
                        name = dependency.name,
                        dir = charts_dir.as_str()
                    ),
                )?,
                Err(err) => self.write_fallback(dependency, &target, &err.to_string())?,
            }
        }
        Ok(())
    }

    fn extract_located(
        &self,
        dependency: &ChartDependency,
        located: &Located,
        target: &VfsPath,
    ) -> Result<(), Error> {
        match &located.schema {
            Some(schema) => {
                copy_file(&located.root.join(schema)?, &target.join(schema)?)?;
                tracing::info!(
                    dependency = dependency.alias_or_name(),
                    origin = %located.origin,
                    %schema,
                    "extracted schema"
                );
            }
            None => self.write_fallback(
                dependency,
                target,
                &format!("{HELM_SCHEMA_FILE} not found in {}", located.origin),
            )?,
        }

        for file in [HELM_CHART_FILE, HELM_VALUES_FILE] {
            let source = located.root.join(file)?;
            if source.is_file()? {
                copy_file(&source, &target.join(file)?)?;
            }
        }

        let manifest = located.root.join(HELM_CHART_FILE)?;
        if !manifest.is_file()? {
            return Ok(());
        }
        match Chart::load(&located.root) {
            Ok(chart) => self.extract_dependencies(
                &located.root.join(CHARTS_DIR)?,
                &chart.dependencies,
                target,
            ),
            Err(err) => {
                tracing::warn!(
                    origin = %located.origin,
                    error = %err,
                    "cannot read chart manifest, skipping nested dependencies"
                );
                Ok(())
            }
        }
    }

    fn write_fallback(
        &self,
        dependency: &ChartDependency,
        target: &VfsPath,
        reason: &str,
    ) -> Result<(), Error> {
        tracing::warn!(
            dependency = %dependency.coordinates(),
            reason,
            "cannot extract schema, run `helm dependency update` to fetch chart archives"
        );
        let path = target.join(HELM_SCHEMA_FILE)?;
        let id = format!("{}/{HELM_SCHEMA_FILE}", dependency.alias_or_name());
        self.io
            .write_json(&path, &fallback_schema(&id, &dependency.coordinates(), reason))
    }
}

/// Find dependency `name` below `charts_dir`, preferring the packaged chart.
fn locate(charts_dir: &VfsPath, name: &str, version: &str) -> Result<Option<Located>, Error> {
    let archive = charts_dir.join(format!("{name}-{version}.tgz"))?;
    if archive.is_file()? {
        let mut bytes = Vec::new();
        archive.open_file()?.read_to_end(&mut bytes)?;
        let (root, schema) = restore_tgz_into_memory_fs(&bytes)?;
        return Ok(Some(Located {
            root,
            schema,
            origin: archive.as_str().to_string(),
        }));
    }

    let unpacked = charts_dir.join(name)?;
    if unpacked.join(HELM_CHART_FILE)?.is_file()? {
        let schema = unpacked
            .join(HELM_SCHEMA_FILE)?
            .is_file()?
            .then(|| HELM_SCHEMA_FILE.to_string());
        return Ok(Some(Located {
            origin: unpacked.as_str().to_string(),
            root: unpacked,
            schema,
        }));
    }
    Ok(None)
}

/// Unpack a chart archive into a fresh in-memory filesystem.
///
/// Returns the chart root (the top level directory of the archive) and the
/// path relative to it of the first entry, in archive order, named like the
/// values schema.
fn restore_tgz_into_memory_fs(bytes: &[u8]) -> Result<(VfsPath, Option<String>), Error> {
    let fs_root = VfsPath::new(vfs::MemoryFS::new());
    let mut chart_root: Option<String> = None;
    let mut schema: Option<String> = None;

    let gz = GzDecoder::new(bytes);
    let mut ar = Archive::new(gz);

    for entry in ar.entries()? {
        let mut e = entry?;
        let path = e.path()?.to_string_lossy().into_owned();
        let path = path.trim_start_matches("./").trim_end_matches('/');
        if path.is_empty() {
            continue;
        }
        let (top, rest) = path.split_once('/').unwrap_or((path, ""));
        if chart_root.is_none() {
            chart_root = Some(top.to_string());
        }
        if schema.is_none()
            && chart_root.as_deref() == Some(top)
            && !rest.is_empty()
            && rest.rsplit('/').next() == Some(HELM_SCHEMA_FILE)
            && !e.header().entry_type().is_dir()
        {
            schema = Some(rest.to_string());
        }

        let out = fs_root.join(path)?;
        if e.header().entry_type().is_dir() {
            out.create_dir_all()?;
        } else {
            out.parent().create_dir_all()?;
            let mut f = out.create_file()?;
            std::io::copy(&mut e, &mut f)?;
        }
    }

    let root = match chart_root {
        Some(top) => fs_root.join(top)?,
        None => fs_root,
    };
    Ok((root, schema))
}

fn copy_file(source: &VfsPath, target: &VfsPath) -> Result<(), Error> {
    let mut bytes = Vec::new();
    source.open_file()?.read_to_end(&mut bytes)?;
    write_bytes(target, &bytes)
}
