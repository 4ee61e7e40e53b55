use std::io::Write;
use std::sync::Once;

use color_eyre::eyre;
use vfs::VfsPath;

mod archive;

pub use archive::ChartArchive;

pub mod prelude {
    pub use crate::matchers::*;
    pub use crate::write;
    pub use crate::{Builder, ChartArchive, LogLevel, memory_root};
    pub use googletest::{assert_that, matcher::MatcherBase, matchers::*};
    pub use similar_asserts::assert_eq as sim_assert_eq;
}

/// An empty in-memory filesystem.
#[must_use]
pub fn memory_root() -> VfsPath {
    VfsPath::new(vfs::MemoryFS::new())
}

/// Write `data` into the virtual filesystem at `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write(path: &VfsPath, data: impl AsRef<[u8]>) -> eyre::Result<VfsPath> {
    path.parent().create_dir_all()?;
    let mut file = path.create_file()?;
    file.write_all(data.as_ref())?;
    file.flush()?;
    Ok(path.clone())
}

/// Read a JSON document from the virtual filesystem.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_json(path: &VfsPath) -> eyre::Result<serde_json::Value> {
    Ok(serde_json::from_str(&path.read_to_string()?)?)
}

pub type LogLevel = tracing::metadata::Level;

static INIT_EYRE: Once = Once::new();
static INIT_TRACING: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Builder {
    setup_tracing: bool,
    install_eyre: bool,
    env_filter: Option<String>,
    log_level: LogLevel,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            setup_tracing: true,
            install_eyre: true,
            env_filter: None,
            log_level: LogLevel::DEBUG,
        }
    }
}

impl Builder {
    /// Initialize test.
    ///
    /// This ensures `color_eyre` and the tracing subscriber are setup once per test binary.
    ///
    /// # Panics
    ///
    /// Panics if `color_eyre` installation fails.
    pub fn build(self) {
        if self.install_eyre {
            INIT_EYRE.call_once(|| {
                color_eyre::install().expect("failed to install eyre");
            });
        }
        if self.setup_tracing {
            INIT_TRACING.call_once(|| {
                let filter = self
                    .env_filter
                    .clone()
                    .unwrap_or_else(|| self.log_level.to_string().to_lowercase());
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                    .with_test_writer()
                    .without_time()
                    .try_init();
            });
        }
    }

    /// Toggle setting up tracing inside the test.
    #[must_use]
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.setup_tracing = enabled;
        self
    }

    /// Toggle log level for tracing inside the test.
    #[must_use]
    pub fn with_log_level(mut self, log_level: impl Into<LogLevel>) -> Self {
        self.log_level = log_level.into();
        self
    }

    /// Toggle installation of `color_eyre`.
    #[must_use]
    pub fn with_eyre(mut self, enabled: bool) -> Self {
        self.install_eyre = enabled;
        self
    }

    /// Configure the tracing subscribers env filter.
    ///
    /// Requires tracing to be enabled with `Self::with_tracing`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }
}

/// Create a new builder.
#[must_use]
pub fn builder() -> Builder {
    Builder::default()
}

pub mod matchers {
    use googletest::matchers::predicate;
    use vfs::VfsPath;

    #[must_use]
    pub fn matches_path(path: &str) -> impl googletest::matcher::Matcher<&VfsPath> {
        predicate(move |p: &VfsPath| p.as_str() == path)
    }

    /// Matches a JSON document holding `expected` at JSON pointer `pointer`.
    #[must_use]
    pub fn has_json_pointer(
        pointer: &str,
        expected: serde_json::Value,
    ) -> impl for<'a> googletest::matcher::Matcher<&'a serde_json::Value> {
        let pointer = pointer.to_string();
        predicate(move |v: &serde_json::Value| v.pointer(&pointer) == Some(&expected))
    }
}
