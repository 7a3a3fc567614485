//! gpumap Common Utilities
//!
//! Shared infrastructure for all gpumap crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading (logging and discovery roots)

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
