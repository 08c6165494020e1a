//! HTTP request handlers for the Axum web server.
//!
//! Handlers are thin wrappers over `DevServerSupervisor` and `LogHub`.

pub mod console;
pub mod server;
