//! # sdjuke common library
//!
//! Shared code for the sdjuke player binaries:
//! - Bootstrap configuration file discovery and parsing
//! - Root folder resolution (CLI > environment > TOML > OS default)
//! - Tracing subscriber initialisation
//! - Common error type

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
