use a2a_blueprints::cli::{self, Cli};
use a2a_blueprints::{Config, logging};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // Flushes the file writer on exit
    let _guard = logging::init(&config.logging)?;

    cli::execute(cli, config).await
}
