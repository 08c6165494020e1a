//! Command-line front end for devconsole.
//!
//! The binary in `main.rs` is the composition root; this library holds the
//! argument parser so it can be tested in isolation.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use anyhow as _;
use dotenvy as _;
use tokio as _;
use tracing as _;
use tracing_subscriber as _;

pub mod parser;

pub use parser::Cli;
