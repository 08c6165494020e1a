//! Network constants for devconsole-axum tests.

/// Loopback interface the WebSocket tests bind to (port 0 = ephemeral).
pub const TEST_HOST: &str = "127.0.0.1";
