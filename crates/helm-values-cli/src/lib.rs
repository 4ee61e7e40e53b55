mod commands;
mod config;
mod error;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use helm_values::logging::LogFormat;

pub use commands::{Context, run};
pub use config::{Config, DEFAULT_CONFIG_FILE, credentials_env_prefix};
pub use error::{CliError, CliResult};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "helm-values",
    version,
    about = "Aggregate and publish JSON schemas for the values of Helm charts"
)]
pub struct Cli {
    /// Log level, overridden by `RUST_LOG`
    #[arg(long, global = true, env = "HELM_VALUES_LOG_LEVEL")]
    pub log_level: Option<tracing::Level>,

    /// Log format (json, pretty or pretty-compact)
    #[arg(long, global = true, env = "HELM_VALUES_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    #[arg(long, global = true, value_enum, default_value_t = Color::Auto)]
    pub color: Color,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download the schemas of dependencies hosted in a mapped schema repository
    Download(ChartArgs),

    /// Extract the schemas of dependencies from the chart archives in `charts/`
    Extract(ChartArgs),

    /// Aggregate the schemas of the chart and all dependencies into one schema
    Aggregate(AggregateArgs),

    /// Generate the publishable values and global values schemas
    Generate(ChartArgs),

    /// Generate and upload the schemas to the publication repository
    Publish(PublishArgs),

    /// Validate a values file against the aggregated schema
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ChartArgs {
    /// Chart directory containing `Chart.yaml`
    #[arg(long, default_value = ".")]
    pub chart_dir: PathBuf,

    /// Configuration file [default: <CHART_DIR>/helm-values.yaml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output directory [default: <CHART_DIR>/build/helm-values]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Write JSON without indentation
    #[arg(long)]
    pub compact: bool,
}

impl ChartArgs {
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.chart_dir.join(DEFAULT_BUILD_DIR))
    }

    #[must_use]
    pub fn config_file(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (self.chart_dir.join(DEFAULT_CONFIG_FILE), false),
        }
    }
}

const DEFAULT_BUILD_DIR: &str = "build/helm-values";

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub chart: ChartArgs,

    /// Use the schemas of a previous download
    #[arg(long)]
    pub skip_download: bool,

    /// Use the schemas of a previous extraction
    #[arg(long)]
    pub skip_extract: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub chart: ChartArgs,

    /// Publish under this chart version instead of the one in `Chart.yaml`
    #[arg(long = "version")]
    pub chart_version: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub chart: ChartArgs,

    /// Values file [default: <CHART_DIR>/values.yaml]
    #[arg(long)]
    pub values: Option<PathBuf>,

    /// Schema [default: <OUTPUT_DIR>/aggregated-values.schema.json]
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Auto,
    Always,
    Never,
}

impl From<Color> for termcolor::ColorChoice {
    fn from(color: Color) -> Self {
        match color {
            Color::Auto => Self::Auto,
            Color::Always => Self::Always,
            Color::Never => Self::Never,
        }
    }
}

/// A path on the physical filesystem, relative to the current directory
/// unless absolute.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined.
pub fn physical_path(path: &Path) -> CliResult<vfs::VfsPath> {
    let absolute = std::path::absolute(path)?;
    let root = vfs::VfsPath::new(vfs::PhysicalFS::new("/"));
    let relative = absolute.to_string_lossy();
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        return Ok(root);
    }
    Ok(root.join(relative)?)
}
