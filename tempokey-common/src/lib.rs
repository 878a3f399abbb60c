//! # tempokey Common Library
//!
//! Shared code for tempokey services:
//! - Error types
//! - Root folder resolution and bootstrap TOML configuration
//! - Data directory layout (input, output, library snapshot)

pub mod config;
pub mod error;

pub use error::{Error, Result};
