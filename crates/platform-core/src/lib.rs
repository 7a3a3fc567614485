//! gpumap platform core contracts.
//!
//! This crate defines the boundary between the adapter registry and the
//! platform backends:
//! - **Descriptors:** what a display subsystem reports for one adapter
//!   and its outputs ([`types`])
//! - **Collaborator traits:** factory, enumerator, probes, adapter, output
//!   ([`traits`])
//! - **Correlating adapter:** matches a display-subsystem adapter with the
//!   graphics-API and telemetry views of the same device ([`adapter`])
//! - **Synthetic backend:** scripted in-memory system for tests and dry runs
//!   ([`synthetic`])

pub mod adapter;
pub mod synthetic;
pub mod traits;
pub mod types;

pub use adapter::{CorrelatedAdapter, MonitorOutput};
pub use synthetic::{SyntheticFactory, SyntheticSystem};
pub use traits::*;
pub use types::*;
