//! Host capability detection and guidance.
//!
//! Discovery reads the DRM class tree, Vulkan ICD manifests and, when the
//! proprietary NVIDIA driver is loaded, its procfs entries.

use serde::Serialize;

use gpumap_common::config::DiscoveryConfig;
use gpumap_platform_core::{GraphicsApi, TelemetryApi};

use crate::display::SysfsDisplayEnumerator;
use crate::probes::{NvmlProbe, VulkanProbe};

/// A host facility that discovery may need.
#[derive(Debug, Clone, Serialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities(config: &DiscoveryConfig) -> Vec<Capability> {
    vec![
        check_drm_access(config),
        check_vulkan_loader(config),
        check_nvidia_driver(config),
    ]
}

/// `true` when every required capability is available.
pub fn all_required_available(capabilities: &[Capability]) -> bool {
    capabilities.iter().all(|cap| cap.available || !cap.required)
}

fn check_drm_access(config: &DiscoveryConfig) -> Capability {
    let drm = config.sysfs_root.join("class").join("drm");
    let available = SysfsDisplayEnumerator::open(&config.sysfs_root).is_ok();

    Capability {
        name: "DRM Display Subsystem".to_string(),
        description: format!("Card and connector enumeration from {}", drm.display()),
        available,
        required: true,
        fix_instructions: if !available {
            Some("Mount sysfs at /sys or point discovery.sysfs_root at a readable tree".to_string())
        } else {
            None
        },
    }
}

fn check_vulkan_loader(config: &DiscoveryConfig) -> Capability {
    let probe = VulkanProbe::detect(config);
    let available = probe.is_available();

    Capability {
        name: "Vulkan ICD".to_string(),
        description: format!("{} installable client driver manifest(s)", probe.manifests().len()),
        available,
        required: true,
        fix_instructions: if !available {
            Some("Install a Vulkan driver: sudo apt install mesa-vulkan-drivers".to_string())
        } else {
            None
        },
    }
}

fn check_nvidia_driver(config: &DiscoveryConfig) -> Capability {
    let probe = NvmlProbe::detect(&config.procfs_root);
    let description = match probe.driver_version() {
        Some(version) => format!("NVIDIA kernel module {version} for adapter telemetry"),
        None => "NVIDIA kernel module for adapter telemetry".to_string(),
    };

    Capability {
        name: "NVIDIA Telemetry".to_string(),
        description,
        available: probe.is_available(),
        required: false, // adapters still initialize without it
        fix_instructions: None,
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("gpumap Host Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
