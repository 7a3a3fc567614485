//! gpumap Adapter Registry
//!
//! Discovers the graphics adapters visible to the process in a single pass,
//! pairs each with its display outputs, and hands out opaque handles for
//! later lookups:
//!
//! - **Initialization:** reconciles the display subsystem's adapter list
//!   with the graphics-API and telemetry views of each device
//! - **Lookups:** by index, hardware id, display name, primary status
//! - **Handles:** `Copy` values that can be validated before use and never
//!   alias objects of another registry
//!
//! The registry is immutable after [`AdapterRegistry::initialize`] returns
//! and is torn down exactly once.

pub mod error;
pub mod handle;
pub mod registry;

pub use error::RegistryError;
pub use handle::{AdapterHandle, OutputHandle};
pub use registry::{AdapterRegistry, RegistrySnapshot, NO_OUTPUT};
