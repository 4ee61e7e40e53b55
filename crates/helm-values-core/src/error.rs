#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vfs error: {0}")]
    Vfs(#[from] vfs::VfsError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json patch error: {0}")]
    Patch(#[from] json_patch::PatchError),

    #[error("missing chart manifest {0}")]
    MissingChartManifest(String),

    #[error("repository {0} not found in repository mappings")]
    RepositoryNotFound(String),

    #[error("failed to publish {file} of chart {chart}:{version} to {uri} (HTTP {code})")]
    Publication {
        chart: String,
        version: String,
        file: String,
        uri: String,
        /// HTTP status code, 0 when no response was received.
        code: u16,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
