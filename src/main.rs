use anyhow::Result;
use tracing_subscriber::EnvFilter;

use deskchess::config::SessionConfig;
use deskchess::console::ConsoleHandler;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = SessionConfig::from_env()?;
    let mut console = ConsoleHandler::new(config);
    console.run()
}
