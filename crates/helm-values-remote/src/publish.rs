use std::io::Read;

use helm_values_core::{Chart, Error, RepositoryMappings};
use vfs::VfsPath;

use crate::{SchemaTransport, UreqTransport};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Uploads generated values schemas of a chart to its publication repository.
pub struct JsonSchemaPublisher {
    mappings: RepositoryMappings,
    transport: Box<dyn SchemaTransport>,
}

impl std::fmt::Debug for JsonSchemaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaPublisher")
            .field("mappings", &self.mappings.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl JsonSchemaPublisher {
    #[must_use]
    pub fn new(mappings: RepositoryMappings) -> Self {
        Self {
            mappings,
            transport: Box::new(UreqTransport::new()),
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: impl SchemaTransport + 'static) -> Self {
        self.transport = Box::new(transport);
        self
    }

    /// PUT the values and global values schema found in `schema_dir` to
    /// `{baseUri}/{name}/{version}/{file}` of repository `repository_key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryNotFound`] before sending anything if the
    /// key is not mapped, and [`Error::Publication`] for the first upload
    /// that is not answered with `201 Created`.
    pub fn publish(
        &self,
        repository_key: &str,
        chart: &Chart,
        schema_dir: &VfsPath,
    ) -> Result<(), Error> {
        let repository = self
            .mappings
            .get(repository_key)
            .ok_or_else(|| Error::RepositoryNotFound(repository_key.to_string()))?;
        let authorization = repository.basic_auth();

        for file in repository.schema_files() {
            let mut body = Vec::new();
            schema_dir.join(file)?.open_file()?.read_to_end(&mut body)?;

            let uri = repository.schema_uri(&chart.name, &chart.version, file);
            let publication_error = |code: u16, reason: String| Error::Publication {
                chart: chart.name.clone(),
                version: chart.version.clone(),
                file: file.to_string(),
                uri: uri.clone(),
                code,
                reason,
            };

            let response = self
                .transport
                .put(&uri, authorization.as_deref(), CONTENT_TYPE_JSON, &body)
                .map_err(|err| publication_error(0, err.to_string()))?;
            if response.status != 201 {
                return Err(publication_error(response.status, response.body_text()));
            }
            tracing::info!(uri = %uri, "published schema");
        }
        Ok(())
    }
}
