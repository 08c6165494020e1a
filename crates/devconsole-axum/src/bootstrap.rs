//! Axum server bootstrap - the composition root.
//!
//! This module is the only place where the log hub and the supervisor are
//! constructed and wired together.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use devconsole_runtime::{
    DEFAULT_EXIT_GRACE, DEFAULT_LOG_CAPACITY, DEFAULT_SUBSCRIBER_QUEUE, DevServerCommand,
    DevServerSupervisor, LogHub,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins.
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port for the HTTP server.
    pub port: u16,
    /// Lines of console backlog kept for late-joining observers.
    pub log_capacity: usize,
    /// Lines an observer may fall behind before it is disconnected.
    pub subscriber_queue: usize,
    /// Command used to run a project's dev server.
    pub dev_command: DevServerCommand,
    /// How long a stop waits for the killed dev server to exit.
    pub exit_grace: Duration,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 3000;

    /// Create config with default values.
    pub fn with_defaults() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            dev_command: DevServerCommand::default(),
            exit_grace: DEFAULT_EXIT_GRACE,
            cors: CorsConfig::default(),
        }
    }

    #[must_use]
    pub fn with_dev_command(mut self, command: DevServerCommand) -> Self {
        self.dev_command = command;
        self
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Services shared by all handlers.
pub struct AppContext {
    /// Console backlog and observer fan-out. Outlives dev-server restarts.
    pub hub: Arc<LogHub>,
    /// The project dev-server supervisor.
    pub supervisor: Arc<DevServerSupervisor>,
}

/// Build the hub and the supervisor publishing into it.
pub fn bootstrap(config: &ServerConfig) -> AppContext {
    let hub = Arc::new(LogHub::new(config.log_capacity, config.subscriber_queue));
    let supervisor = DevServerSupervisor::new(config.dev_command.clone(), hub.clone())
        .with_exit_grace(config.exit_grace);

    info!(
        command = %config.dev_command,
        log_capacity = config.log_capacity,
        subscriber_queue = config.subscriber_queue,
        "devconsole bootstrapped"
    );

    AppContext {
        hub,
        supervisor: Arc::new(supervisor),
    }
}

/// Serve the API until Ctrl-C, then stop the dev server.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(&config);
    let hub = Arc::clone(&ctx.hub);
    let supervisor = Arc::clone(&ctx.supervisor);

    let app = crate::routes::create_router(ctx, &config.cors);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("devconsole listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            supervisor.shutdown().await;
            // End console streams so open connections can drain
            hub.close_subscribers();
        })
        .await?;

    info!("devconsole stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C; shutting down");
    }
}
