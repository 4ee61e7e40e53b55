use clap::Parser;
use color_eyre::eyre;
use helm_values_cli::{Cli, run};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    helm_values::logging::setup_logging(cli.log_level, cli.log_format, cli.color.into())?;
    run(cli)?;
    Ok(())
}
