pub mod ports;

use devconsole_axum::{AppContext, CorsConfig, ServerConfig, bootstrap};
use devconsole_runtime::DevServerCommand;
use std::time::Duration;

/// Config whose dev command is a harmless long-running shell script.
pub fn test_config(script: &str) -> ServerConfig {
    ServerConfig {
        host: ports::TEST_HOST.to_string(),
        port: 0,
        log_capacity: 100,
        subscriber_queue: 64,
        dev_command: DevServerCommand::shell(script),
        exit_grace: Duration::from_secs(2),
        cors: CorsConfig::AllowAll,
    }
}

#[allow(dead_code)]
pub fn test_context(script: &str) -> AppContext {
    bootstrap(&test_config(script))
}
