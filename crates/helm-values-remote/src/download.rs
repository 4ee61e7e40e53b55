use helm_values_core::{
    Chart, ChartDependency, Error, JsonSchemaRepository, RepositoryMappings, SchemaIo,
    fallback_schema, node, recreate_dir,
};
use serde_json::Value;
use url::Url;
use vfs::VfsPath;

use crate::{SchemaTransport, UreqTransport};

/// A schema file written by [`SchemaDownloader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedSchema {
    /// Folder below the download directory, the alias or name of the dependency.
    pub base_folder: String,
    /// Path of the file relative to `base_folder`.
    pub path: String,
    /// Whether the file was only discovered as the target of a `$ref`.
    pub is_reference: bool,
}

/// The dependency whose schemas are currently being fetched.
struct Target<'a> {
    dependency: &'a ChartDependency,
    repository: &'a JsonSchemaRepository,
    folder: VfsPath,
    base_folder: &'a str,
    /// `{baseUri}/{name}/{version}`
    chart_uri: String,
}

/// Downloads values schemas of mapped dependencies and every file they reference.
///
/// Files land in `<download-dir>/<alias-or-name>/`. Files below the chart
/// folder of the repository keep their relative path, any other referenced file
/// is mirrored to `<host>/<url-path>` inside the same folder.
pub struct SchemaDownloader {
    download_dir: VfsPath,
    mappings: RepositoryMappings,
    io: SchemaIo,
    transport: Box<dyn SchemaTransport>,
}

impl std::fmt::Debug for SchemaDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDownloader")
            .field("download_dir", &self.download_dir.as_str())
            .field("mappings", &self.mappings.keys().collect::<Vec<_>>())
            .field("io", &self.io)
            .finish_non_exhaustive()
    }
}

impl SchemaDownloader {
    #[must_use]
    pub fn new(download_dir: VfsPath, mappings: RepositoryMappings, io: SchemaIo) -> Self {
        Self {
            download_dir,
            mappings,
            io,
            transport: Box::new(UreqTransport::new()),
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: impl SchemaTransport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// Replace the content of the download directory with the schemas of all
    /// mapped dependencies of `chart`.
    ///
    /// Failed requests never abort the download: a fallback schema describing
    /// the failure is written in place of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the download directory cannot be written.
    pub fn download(&self, chart: &Chart) -> Result<Vec<DownloadedSchema>, Error> {
        recreate_dir(&self.download_dir)?;
        let mut downloaded = Vec::new();

        for dependency in &chart.dependencies {
            let Some(repository) = dependency.mapped_repository(&self.mappings) else {
                continue;
            };
            let Some(version) = dependency.version.as_deref() else {
                tracing::warn!(
                    dependency = %dependency.name,
                    "mapped dependency has no version, skipping download"
                );
                continue;
            };
            let base_folder = dependency.alias_or_name();
            let target = Target {
                dependency,
                repository,
                folder: self.download_dir.join(base_folder)?,
                base_folder,
                chart_uri: repository.chart_uri(&dependency.name, version),
            };
            for file in repository.schema_files() {
                let uri = format!("{}/{file}", target.chart_uri);
                self.fetch(&target, &uri, file, false, &mut downloaded)?;
            }
        }
        Ok(downloaded)
    }

    fn fetch(
        &self,
        target: &Target<'_>,
        uri: &str,
        local: &str,
        is_reference: bool,
        downloaded: &mut Vec<DownloadedSchema>,
    ) -> Result<(), Error> {
        let path = target.folder.join(local)?;
        if path.exists()? {
            return Ok(());
        }
        downloaded.push(DownloadedSchema {
            base_folder: target.base_folder.to_string(),
            path: local.to_string(),
            is_reference,
        });

        let mut schema = match self.request(target, uri) {
            Ok(schema) => {
                tracing::info!(uri, path = path.as_str(), "downloaded schema");
                schema
            }
            Err(reason) => {
                tracing::warn!(uri, %reason, "download failed, writing fallback schema");
                let fallback = fallback_schema(uri, &target.dependency.coordinates(), &reason);
                return self.io.write_json(&path, &fallback);
            }
        };
        // written before following references, so cycles end at the existence check
        self.io.write_json(&path, &schema)?;

        let mut changed = false;
        for found in node::collect_refs(&schema) {
            let (file, fragment) = found
                .reference
                .split_once('#')
                .map_or((found.reference.as_str(), None), |(f, p)| (f, Some(p)));
            if file.is_empty() {
                continue;
            }
            let is_full_uri = Url::parse(file).is_ok();
            let Some(resolved) = resolve_uri(uri, file) else {
                tracing::warn!(uri, reference = %found.reference, "cannot resolve reference");
                continue;
            };
            let Some(resolved_local) = local_path_for(&target.chart_uri, &resolved) else {
                tracing::warn!(uri, reference = %found.reference, "cannot map reference");
                continue;
            };

            self.fetch(target, resolved.as_str(), &resolved_local, true, downloaded)?;

            let relative = relative_path(local, &resolved_local);
            if is_full_uri || is_reference || relative != file {
                let rewritten = match fragment {
                    Some(fragment) => format!("{relative}#{fragment}"),
                    None => relative,
                };
                if rewritten != found.reference {
                    tracing::debug!(from = %found.reference, to = %rewritten, "rewrite reference");
                    changed |= node::set_ref(&mut schema, &found.location, rewritten);
                }
            }
        }

        if changed {
            self.io.write_json(&path, &schema)?;
        }
        Ok(())
    }

    fn request(&self, target: &Target<'_>, uri: &str) -> Result<Value, String> {
        let authorization = target.repository.basic_auth();
        let response = self
            .transport
            .get(uri, authorization.as_deref())
            .map_err(|err| err.to_string())?;
        if response.status != 200 {
            return Err(format!(
                "HTTP {} for {uri}: {}",
                response.status,
                response.body_text().trim()
            ));
        }
        serde_json::from_slice(&response.body).map_err(|err| format!("invalid JSON at {uri}: {err}"))
    }
}

/// Resolve `reference` against the URI of the referencing document.
fn resolve_uri(base: &str, reference: &str) -> Option<Url> {
    match Url::parse(reference) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(reference).ok(),
        Err(_) => None,
    }
}

/// Path below the dependency folder where the document at `uri` is stored.
fn local_path_for(chart_uri: &str, uri: &Url) -> Option<String> {
    let mut uri = uri.clone();
    uri.set_fragment(None);
    uri.set_query(None);
    if let Some(rest) = uri.as_str().strip_prefix(chart_uri)
        && let Some(rest) = rest.strip_prefix('/')
        && !rest.is_empty()
    {
        return Some(rest.to_string());
    }

    let host = uri.host_str()?;
    let host = match uri.port() {
        Some(port) => format!("{host}_{port}"),
        None => host.to_string(),
    };
    let path = uri.path().trim_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(format!("{host}/{path}"))
}

/// Relative path from the file `from` to the file `to`, both relative to the same folder.
fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = from.split('/').collect();
    let from_dir = &from_dir[..from_dir.len().saturating_sub(1)];
    let to: Vec<&str> = to.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend(&to[common..]);
    parts.join("/")
}
