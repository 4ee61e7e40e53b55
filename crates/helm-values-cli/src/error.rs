#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Schema(#[from] helm_values::Error),

    #[error("vfs error: {0}")]
    Vfs(#[from] vfs::VfsError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read configuration {path}")]
    Config {
        path: String,
        #[source]
        source: helm_values::Error,
    },

    #[error("failed to read chart manifest in {path}")]
    ChartManifest {
        path: String,
        #[source]
        source: helm_values::Error,
    },

    #[error("no publication repository configured, set `publicationRepository` in the configuration")]
    MissingPublicationRepository,

    #[error("{path} is not a valid JSON schema: {reason}")]
    InvalidSchema { path: String, reason: String },

    #[error("{path} does not match the schema ({count} errors)")]
    ValidationFailed { path: String, count: usize },
}

pub type CliResult<T> = std::result::Result<T, CliError>;
