//! gpumap Linux Platform Integration
//!
//! Filesystem-only implementations of the registry collaborators:
//! - **Display subsystem:** DRM cards and connectors from sysfs
//! - **Graphics API probe:** Vulkan ICD manifests plus PCI display devices
//! - **Telemetry probe:** NVIDIA driver procfs entries
//! - **Capabilities:** what is reachable on this host and how to fix it

pub mod capabilities;
pub mod display;
pub mod factory;
pub mod probes;

pub use display::SysfsDisplayEnumerator;
pub use factory::LinuxFactory;
pub use probes::{NvmlProbe, VulkanProbe};
