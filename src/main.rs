use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod cli;

use app::App;
use cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    tracing::info!(
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        output = %config.participant_dir().display(),
        "reaching experiment"
    );

    App::new(config).run()
}
