//! CLI entry point - the composition root.

use clap::Parser;
use devconsole_cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_server_config();
    tracing::debug!(?config, "Resolved server configuration");

    devconsole_axum::start_server(config).await
}
