//! Skillbot Server - Main entry point.

use anyhow::Result;
use skillbot_common::config::Config;
use skillbot_common::logging::init_logging;
use skillbot_server::start_server;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Skillbot Server v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;

    // Start the HTTP server
    start_server(&config).await
}
