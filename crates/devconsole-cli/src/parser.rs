//! Top-level argument handling.
//!
//! Every option falls back to an environment variable, so a `.env` file next
//! to the binary can hold the whole configuration.

use std::time::Duration;

use clap::Parser;
use devconsole_axum::ServerConfig;
use devconsole_runtime::{
    DEFAULT_LOG_CAPACITY, DEFAULT_SUBSCRIBER_QUEUE, DevServerCommand,
};

/// Supervise a project's dev server and stream its console to the browser.
#[derive(Debug, Parser)]
#[command(name = "devconsole")]
#[command(about = "Run a project's dev server and stream its console output")]
#[command(version)]
pub struct Cli {
    /// Interface to bind the HTTP server to
    #[arg(long, env = "DEVCONSOLE_HOST", default_value = ServerConfig::DEFAULT_HOST)]
    pub host: String,

    /// Port for the HTTP server
    #[arg(short = 'p', long, env = "PORT", default_value_t = ServerConfig::DEFAULT_PORT)]
    pub port: u16,

    /// Console lines kept for observers that connect late
    #[arg(long, env = "DEVCONSOLE_LOG_CAPACITY", default_value_t = DEFAULT_LOG_CAPACITY)]
    pub log_capacity: usize,

    /// Lines an observer may fall behind before it is disconnected
    #[arg(long, env = "DEVCONSOLE_SUBSCRIBER_QUEUE", default_value_t = DEFAULT_SUBSCRIBER_QUEUE)]
    pub subscriber_queue: usize,

    /// Shell line that starts a project's dev server
    #[arg(long, env = "DEVCONSOLE_DEV_COMMAND", default_value = DevServerCommand::DEFAULT_SHELL_LINE)]
    pub dev_command: String,

    /// Restrict CORS to this origin (repeatable; all origins allowed if unset)
    #[arg(long = "allowed-origin", value_name = "ORIGIN")]
    pub allowed_origins: Vec<String>,

    /// Seconds a stop waits for the killed dev server to exit (0 disables the check)
    #[arg(long, default_value_t = 2)]
    pub exit_grace_secs: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn into_server_config(self) -> ServerConfig {
        let mut config = ServerConfig {
            host: self.host,
            port: self.port,
            log_capacity: self.log_capacity,
            subscriber_queue: self.subscriber_queue,
            exit_grace: Duration::from_secs(self.exit_grace_secs),
            ..ServerConfig::with_defaults()
        }
        .with_dev_command(DevServerCommand::shell(self.dev_command));

        if !self.allowed_origins.is_empty() {
            config = config.with_allowed_origins(self.allowed_origins);
        }
        config
    }
}
