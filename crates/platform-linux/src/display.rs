//! DRM display subsystem enumeration from sysfs.
//!
//! Every `class/drm/cardN` directory backed by a PCI device is one adapter.
//! Its outputs are the `cardN-<connector>` entries whose `status` reads
//! `connected`.

use std::fs;
use std::path::{Path, PathBuf};

use gpumap_common::error::{GpumapError, GpumapResult};
use gpumap_platform_core::{
    AdapterDescriptor, DisplayEnumerator, OutputDescriptor, PciAddress, Vendor,
};

/// Display-subsystem view of the DRM cards present when it was opened.
#[derive(Debug, Clone)]
pub struct SysfsDisplayEnumerator {
    adapters: Vec<AdapterDescriptor>,
}

impl SysfsDisplayEnumerator {
    /// Scan `<sysfs_root>/class/drm`. Fails when the directory is unreadable.
    pub fn open(sysfs_root: &Path) -> GpumapResult<Self> {
        let drm = sysfs_root.join("class").join("drm");
        let entries = fs::read_dir(&drm).map_err(|e| {
            GpumapError::discovery(format!("Cannot read {}: {e}", drm.display()))
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let mut cards: Vec<(u32, PathBuf)> = names
            .iter()
            .filter_map(|name| card_number(name).map(|n| (n, drm.join(name))))
            .collect();
        cards.sort_by_key(|(n, _)| *n);

        let mut adapters = Vec::new();
        let mut primary_taken = false;

        for (number, path) in cards {
            let Some(mut descriptor) = read_card(number, &path) else {
                tracing::debug!(card = number, "Skipping DRM card without PCI device");
                continue;
            };

            let prefix = format!("card{number}-");
            for connector in names.iter().filter(|name| name.starts_with(&prefix)) {
                let status = read_trimmed(&drm.join(connector).join("status"));
                if status.as_deref() != Some("connected") {
                    continue;
                }
                descriptor.outputs.push(OutputDescriptor {
                    device_name: connector[prefix.len()..].to_string(),
                    primary: !primary_taken,
                    connector: Some(connector.clone()),
                });
                primary_taken = true;
            }

            tracing::debug!(
                card = number,
                adapter = %descriptor.description,
                outputs = descriptor.outputs.len(),
                "Found DRM card"
            );
            adapters.push(descriptor);
        }

        Ok(Self { adapters })
    }

    pub fn adapters(&self) -> &[AdapterDescriptor] {
        &self.adapters
    }
}

impl DisplayEnumerator for SysfsDisplayEnumerator {
    fn adapter_at(&self, index: u32) -> Option<AdapterDescriptor> {
        self.adapters.get(index as usize).cloned()
    }
}

/// `card0` -> `Some(0)`; connectors such as `card0-DP-1` and render nodes
/// are not cards.
fn card_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("card")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn read_card(number: u32, card: &Path) -> Option<AdapterDescriptor> {
    let device = card.join("device");
    let vendor_id = read_hex_u16(&device.join("vendor"))?;
    let device_id = read_hex_u16(&device.join("device")).unwrap_or(0);
    let uevent = fs::read_to_string(device.join("uevent")).unwrap_or_default();

    let pci = uevent_value(&uevent, "PCI_SLOT_NAME").and_then(|slot| slot.parse().ok());
    let driver = uevent_value(&uevent, "DRIVER").map(str::to_string);

    Some(AdapterDescriptor {
        description: format!(
            "card{number} ({:?} {vendor_id:04x}:{device_id:04x})",
            Vendor::from_pci_id(vendor_id)
        ),
        vendor_id,
        device_id,
        hardware_id: pci.map(|pci: PciAddress| pci.hardware_id()),
        pci,
        driver,
        outputs: Vec::new(),
    })
}

fn uevent_value<'a>(uevent: &'a str, key: &str) -> Option<&'a str> {
    uevent.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        (k.trim() == key).then(|| v.trim())
    })
}

pub(crate) fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

/// Parse sysfs id files such as `0x10de`.
pub(crate) fn read_hex_u16(path: &Path) -> Option<u16> {
    let value = read_trimmed(path)?;
    let digits = value.strip_prefix("0x").unwrap_or(&value);
    u16::from_str_radix(digits, 16).ok()
}


#[cfg(test)]
mod tests {
    use super::fixture::{card, connector};
    use super::*;

    #[test]
    fn card_numbers_exclude_connectors_and_render_nodes() {
        assert_eq!(card_number("card0"), Some(0));
        assert_eq!(card_number("card12"), Some(12));
        assert_eq!(card_number("card0-DP-1"), None);
        assert_eq!(card_number("renderD128"), None);
        assert_eq!(card_number("card"), None);
    }

    #[test]
    fn enumerates_cards_in_numeric_order_with_connected_outputs() {
        let root = tempfile::TempDir::new().unwrap();
        card(root.path(), 10, "0x1002", "0x744c", "0000:03:00.0", "amdgpu");
        card(root.path(), 2, "0x10de", "0x2684", "0000:01:00.0", "nvidia");
        connector(root.path(), 2, "DP-1", "disconnected");
        connector(root.path(), 2, "HDMI-A-1", "connected");
        connector(root.path(), 10, "DP-3", "connected");

        let enumerator = SysfsDisplayEnumerator::open(root.path()).unwrap();
        let adapters = enumerator.adapters();
        assert_eq!(adapters.len(), 2);

        let nvidia = &adapters[0];
        assert_eq!(nvidia.vendor_id, 0x10de);
        assert_eq!(nvidia.driver.as_deref(), Some("nvidia"));
        assert_eq!(nvidia.pci, Some(PciAddress::new(0, 1, 0, 0)));
        assert_eq!(nvidia.hardware_id, Some(PciAddress::new(0, 1, 0, 0).hardware_id()));
        assert_eq!(nvidia.outputs.len(), 1);
        assert_eq!(nvidia.outputs[0].device_name, "HDMI-A-1");
        assert!(nvidia.outputs[0].primary);

        let amd = &adapters[1];
        assert_eq!(amd.outputs[0].device_name, "DP-3");
        assert!(!amd.outputs[0].primary);

        assert!(enumerator.adapter_at(2).is_none());
    }

    #[test]
    fn cards_without_pci_device_are_skipped() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("class/drm/card0")).unwrap();
        card(root.path(), 1, "0x8086", "0x56a0", "0000:00:02.0", "i915");

        let enumerator = SysfsDisplayEnumerator::open(root.path()).unwrap();
        assert_eq!(enumerator.adapters().len(), 1);
        assert_eq!(enumerator.adapters()[0].vendor_id, 0x8086);
    }

    #[test]
    fn missing_drm_class_is_an_error() {
        let root = tempfile::TempDir::new().unwrap();
        assert!(SysfsDisplayEnumerator::open(root.path()).is_err());
    }

    #[test]
    fn uevent_lookup_matches_whole_keys() {
        let uevent = "DRIVER=nvidia\nPCI_ID=10DE:2684\nPCI_SLOT_NAME=0000:01:00.0\n";
        assert_eq!(uevent_value(uevent, "DRIVER"), Some("nvidia"));
        assert_eq!(uevent_value(uevent, "PCI_SLOT_NAME"), Some("0000:01:00.0"));
        assert_eq!(uevent_value(uevent, "PCI"), None);
    }
}
