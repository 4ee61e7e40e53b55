use std::path::Path;

use helm_values::common::{
    AGGREGATED_SCHEMA_FILE, DOWNLOAD_DIR, EXTRACT_DIR, GENERATED_DIR, GLOBAL_VALUES_SCHEMA_FILE,
    HELM_VALUES_FILE, PATCH_AGGREGATED_SCHEMA_FILE, PATCH_VALUES_SCHEMA_FILE, VALUES_SCHEMA_FILE,
    load_json_patch,
};
use helm_values::{
    Chart, JsonSchemaAggregator, JsonSchemaPublisher, SchemaDownloader, SchemaExtractor, SchemaIo,
};
use serde_json::{Value, json};
use vfs::VfsPath;

use crate::{
    ChartArgs, Cli, Command, Config, physical_path,
    error::{CliError, CliResult},
};

/// Chart, configuration and directories a command operates on.
#[derive(Debug, Clone)]
pub struct Context {
    pub chart_dir: VfsPath,
    pub output_dir: VfsPath,
    pub chart: Chart,
    pub config: Config,
    pub io: SchemaIo,
}

impl Context {
    /// # Errors
    ///
    /// Returns an error if the chart manifest or the configuration cannot be read.
    pub fn load(args: &ChartArgs) -> CliResult<Self> {
        let io = if args.compact {
            SchemaIo::compact()
        } else {
            SchemaIo::default()
        };
        let chart_dir = physical_path(&args.chart_dir)?;
        let chart = Chart::load(&chart_dir).map_err(|source| CliError::ChartManifest {
            path: chart_dir.as_str().to_string(),
            source,
        })?;
        let (config_file, required) = args.config_file();
        let config = Config::load(&io, &physical_path(&config_file)?, required)?
            .with_env_credentials(|name| std::env::var(name).ok());

        Ok(Self {
            output_dir: physical_path(&args.output_dir())?,
            chart_dir,
            chart,
            config,
            io,
        })
    }

    fn download_dir(&self) -> CliResult<VfsPath> {
        Ok(self.output_dir.join(DOWNLOAD_DIR)?)
    }

    fn extract_dir(&self) -> CliResult<VfsPath> {
        Ok(self.output_dir.join(EXTRACT_DIR)?)
    }
}

/// Run the CLI.
///
/// # Errors
///
/// Returns an error if the chart or configuration cannot be loaded, a
/// command fails or validation finds errors.
pub fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Download(args) => download(&Context::load(&args)?),
        Command::Extract(args) => extract(&Context::load(&args)?),
        Command::Aggregate(args) => aggregate(
            &Context::load(&args.chart)?,
            args.skip_download,
            args.skip_extract,
        ),
        Command::Generate(args) => generate(&Context::load(&args)?).map(|_| ()),
        Command::Publish(args) => {
            let mut ctx = Context::load(&args.chart)?;
            if let Some(version) = args.chart_version {
                ctx.chart.version = version;
            }
            publish(&ctx)
        }
        Command::Validate(args) => validate(
            &Context::load(&args.chart)?,
            args.values.as_deref(),
            args.schema.as_deref(),
        ),
    }
}

fn download(ctx: &Context) -> CliResult<()> {
    let dir = ctx.download_dir()?;
    let downloaded = SchemaDownloader::new(
        dir.clone(),
        ctx.config.repository_mappings.clone(),
        ctx.io,
    )
    .download(&ctx.chart)?;
    tracing::info!(files = downloaded.len(), dir = dir.as_str(), "downloaded schemas");
    Ok(())
}

fn extract(ctx: &Context) -> CliResult<()> {
    let dir = ctx.extract_dir()?;
    SchemaExtractor::new(ctx.chart_dir.join("charts")?, dir.clone(), ctx.io).extract(&ctx.chart)?;
    tracing::info!(dir = dir.as_str(), "extracted schemas");
    Ok(())
}

fn aggregate(ctx: &Context, skip_download: bool, skip_extract: bool) -> CliResult<()> {
    if !skip_download {
        download(ctx)?;
    }
    if !skip_extract {
        extract(ctx)?;
    }

    let values_patch = load_json_patch(&ctx.io, &ctx.chart_dir.join(PATCH_VALUES_SCHEMA_FILE)?)?;
    let aggregated_patch =
        load_json_patch(&ctx.io, &ctx.chart_dir.join(PATCH_AGGREGATED_SCHEMA_FILE)?)?;

    let schema = JsonSchemaAggregator::new(
        ctx.config.generator(),
        ctx.chart_dir.clone(),
        ctx.download_dir()?,
        ctx.extract_dir()?,
        ctx.io,
    )
    .aggregate(&ctx.chart, values_patch.as_ref(), aggregated_patch.as_ref())?;

    let path = ctx.output_dir.join(AGGREGATED_SCHEMA_FILE)?;
    ctx.io.write_json(&path, &schema)?;
    tracing::info!(path = path.as_str(), "wrote aggregated schema");
    Ok(())
}

fn generate(ctx: &Context) -> CliResult<VfsPath> {
    let generator = ctx.config.generator();
    let values_patch = load_json_patch(&ctx.io, &ctx.chart_dir.join(PATCH_VALUES_SCHEMA_FILE)?)?;
    let values = generator.generate_values_json_schema(&ctx.chart, values_patch.as_ref())?;
    let global = generator.generate_global_values_json_schema(&ctx.chart, None)?;

    let (values_file, global_file) = match generator.publication_repository()? {
        Some(repository) => (
            repository.values_schema_file.as_str(),
            repository.global_values_schema_file.as_str(),
        ),
        None => (VALUES_SCHEMA_FILE, GLOBAL_VALUES_SCHEMA_FILE),
    };
    let dir = ctx.output_dir.join(GENERATED_DIR)?;
    ctx.io.write_json(&dir.join(values_file)?, &values)?;
    ctx.io.write_json(&dir.join(global_file)?, &global)?;
    tracing::info!(dir = dir.as_str(), "generated schemas");
    Ok(dir)
}

fn publish(ctx: &Context) -> CliResult<()> {
    let key = ctx
        .config
        .publication_repository
        .as_deref()
        .ok_or(CliError::MissingPublicationRepository)?;
    let dir = generate(ctx)?;
    JsonSchemaPublisher::new(ctx.config.repository_mappings.clone()).publish(
        key,
        &ctx.chart,
        &dir,
    )?;
    tracing::info!(chart = %ctx.chart.coordinates(), repository = key, "published schemas");
    Ok(())
}

fn validate(ctx: &Context, values: Option<&Path>, schema: Option<&Path>) -> CliResult<()> {
    let values_path = match values {
        Some(path) => physical_path(path)?,
        None => ctx.chart_dir.join(HELM_VALUES_FILE)?,
    };
    let schema_path = match schema {
        Some(path) => physical_path(path)?,
        None => ctx.output_dir.join(AGGREGATED_SCHEMA_FILE)?,
    };

    let schema = ctx.io.read_json(&schema_path)?;
    let values = match ctx.io.read_yaml::<Value>(&values_path)? {
        Value::Null => json!({}),
        values => values,
    };
    let validator = jsonschema::validator_for(&schema).map_err(|err| CliError::InvalidSchema {
        path: schema_path.as_str().to_string(),
        reason: err.to_string(),
    })?;

    let errors: Vec<String> = validator
        .iter_errors(&values)
        .map(|err| {
            let location = err.instance_path.to_string();
            let location = if location.is_empty() { "/".to_string() } else { location };
            format!("{location}: {err}")
        })
        .collect();
    if errors.is_empty() {
        println!("{} is valid", values_path.as_str());
        return Ok(());
    }
    for error in &errors {
        println!("{error}");
    }
    Err(CliError::ValidationFailed {
        path: values_path.as_str().to_string(),
        count: errors.len(),
    })
}
