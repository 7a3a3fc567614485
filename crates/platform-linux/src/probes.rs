//! Graphics-API and telemetry probes backed by the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use gpumap_common::config::DiscoveryConfig;
use gpumap_platform_core::{
    GraphicsApi, PciAddress, PhysicalDevice, TelemetryApi, TelemetryDevice, Vendor,
};

use crate::display::{read_hex_u16, read_trimmed};

/// PCI base class for display controllers.
const PCI_CLASS_DISPLAY: u32 = 0x03;

/// Vulkan availability from installed ICD manifests.
///
/// The loader is usable when at least one manifest is installed; the devices
/// it can drive are taken to be the PCI display controllers.
#[derive(Debug, Clone)]
pub struct VulkanProbe {
    manifests: Vec<PathBuf>,
    devices: Vec<PhysicalDevice>,
}

impl VulkanProbe {
    pub fn detect(config: &DiscoveryConfig) -> Self {
        let manifests = find_icd_manifests(&config.vulkan_icd_dirs);
        let devices = if manifests.is_empty() {
            Vec::new()
        } else {
            pci_display_devices(&config.sysfs_root)
        };

        tracing::debug!(
            manifests = manifests.len(),
            devices = devices.len(),
            "Vulkan probe finished"
        );
        Self { manifests, devices }
    }

    pub fn manifests(&self) -> &[PathBuf] {
        &self.manifests
    }
}

impl GraphicsApi for VulkanProbe {
    fn is_available(&self) -> bool {
        !self.manifests.is_empty()
    }

    fn name(&self) -> &str {
        "vulkan"
    }

    fn physical_devices(&self) -> Vec<PhysicalDevice> {
        self.devices.clone()
    }
}

fn find_icd_manifests(dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut manifests: Vec<PathBuf> = dirs
        .iter()
        .filter_map(|dir| fs::read_dir(dir).ok())
        .flatten()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    manifests.sort();
    manifests
}

/// Display-class devices under `<sysfs_root>/bus/pci/devices`.
fn pci_display_devices(sysfs_root: &Path) -> Vec<PhysicalDevice> {
    let dir = sysfs_root.join("bus").join("pci").join("devices");
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut devices: Vec<PhysicalDevice> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let pci: PciAddress = entry.file_name().to_str()?.parse().ok()?;
            let class = read_trimmed(&path.join("class"))?;
            let class = u32::from_str_radix(class.trim_start_matches("0x"), 16).ok()?;
            if class >> 16 != PCI_CLASS_DISPLAY {
                return None;
            }

            let vendor_id = read_hex_u16(&path.join("vendor"))?;
            let device_id = read_hex_u16(&path.join("device")).unwrap_or(0);
            Some(PhysicalDevice {
                name: format!(
                    "{:?} {vendor_id:04x}:{device_id:04x}",
                    Vendor::from_pci_id(vendor_id)
                ),
                vendor_id,
                device_id,
                hardware_id: Some(pci.hardware_id()),
                pci: Some(pci),
                driver_version: read_trimmed(&path.join("driver").join("module").join("version")),
            })
        })
        .collect();
    devices.sort_by_key(|device| device.pci);
    devices
}

/// NVIDIA telemetry from the proprietary driver's procfs tree.
#[derive(Debug, Clone)]
pub struct NvmlProbe {
    root: PathBuf,
    driver_version: Option<String>,
}

impl NvmlProbe {
    pub fn detect(procfs_root: &Path) -> Self {
        let root = procfs_root.join("driver").join("nvidia");
        let driver_version = fs::read_to_string(root.join("version"))
            .ok()
            .map(|content| parse_driver_version(&content).unwrap_or_default());

        Self {
            root,
            driver_version,
        }
    }

    /// Kernel module version, when the driver is loaded.
    pub fn driver_version(&self) -> Option<&str> {
        self.driver_version.as_deref().filter(|v| !v.is_empty())
    }
}

impl TelemetryApi for NvmlProbe {
    fn is_available(&self) -> bool {
        self.driver_version.is_some()
    }

    fn name(&self) -> &str {
        "nvml"
    }

    fn device(&self, pci: &PciAddress) -> Option<TelemetryDevice> {
        if !self.is_available() {
            return None;
        }
        let information = self
            .root
            .join("gpus")
            .join(pci.to_string())
            .join("information");
        let content = fs::read_to_string(information).ok()?;
        let model = info_field(&content, "Model")?;

        Some(TelemetryDevice {
            pci: *pci,
            model: model.to_string(),
            uuid: info_field(&content, "GPU UUID").map(str::to_string),
        })
    }
}

/// `NVRM version: NVIDIA UNIX x86_64 Kernel Module  550.54.14  Thu Feb 22 ...`
fn parse_driver_version(content: &str) -> Option<String> {
    let line = content.lines().find(|line| line.starts_with("NVRM version:"))?;
    let rest = line.split("Kernel Module").nth(1)?;
    rest.split_whitespace().next().map(str::to_string)
}

fn info_field<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}
