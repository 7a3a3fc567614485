//! Plain data exchanged between display subsystems, probes and adapters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Two-part unique adapter identifier (LUID-equivalent).
///
/// Adapters that cannot report one carry `None` rather than a zeroed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareId {
    pub high: u32,
    pub low: u32,
}

impl HardwareId {
    pub const fn new(high: u32, low: u32) -> Self {
        Self { high, low }
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.high, self.low)
    }
}

/// Error returned when parsing a [`HardwareId`] or [`PciAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{input}'")]
pub struct ParseIdError {
    kind: &'static str,
    input: String,
}

impl ParseIdError {
    fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

impl FromStr for HardwareId {
    type Err = ParseIdError;

    /// Accepts `high:low` where each part is hex, with or without `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::new("hardware id", s);
        let (high, low) = s.trim().split_once(':').ok_or_else(err)?;
        let parse = |part: &str| {
            let part = part.trim();
            let digits = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u32::from_str_radix(digits, 16).map_err(|_| err())
        };
        Ok(Self::new(parse(high)?, parse(low)?))
    }
}

/// PCI bus address (`domain:bus:device.function`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PciAddress {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciAddress {
    pub const fn new(domain: u16, bus: u8, device: u8, function: u8) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
        }
    }

    /// Hardware id derived from the bus position, for platforms without a
    /// native adapter LUID.
    pub fn hardware_id(&self) -> HardwareId {
        let low = (u32::from(self.bus) << 8)
            | (u32::from(self.device & 0x1f) << 3)
            | u32::from(self.function & 0x07);
        HardwareId::new(u32::from(self.domain), low)
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl FromStr for PciAddress {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::new("pci address", s);
        let s = s.trim();
        let (domain, rest) = s.split_once(':').ok_or_else(err)?;
        let (bus, rest) = rest.split_once(':').ok_or_else(err)?;
        let (device, function) = rest.split_once('.').ok_or_else(err)?;

        Ok(Self {
            domain: u16::from_str_radix(domain, 16).map_err(|_| err())?,
            bus: u8::from_str_radix(bus, 16).map_err(|_| err())?,
            device: u8::from_str_radix(device, 16).map_err(|_| err())?,
            function: u8::from_str_radix(function, 16).map_err(|_| err())?,
        })
    }
}

/// GPU vendor identification from the PCI vendor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vendor {
    Nvidia,
    Amd,
    Intel,
    /// VirtIO virtual GPU
    VirtIo,
    /// QXL / Red Hat virtual GPU
    Qxl,
    Other(u16),
}

impl Vendor {
    pub fn from_pci_id(vendor_id: u16) -> Self {
        match vendor_id {
            0x10de => Self::Nvidia,
            0x1002 | 0x1022 => Self::Amd,
            0x8086 => Self::Intel,
            0x1af4 => Self::VirtIo,
            0x1b36 => Self::Qxl,
            other => Self::Other(other),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::VirtIo | Self::Qxl)
    }
}

/// What the display subsystem reports for one of its outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDescriptor {
    /// Display device name used for name lookups (e.g. `\\.\DISPLAY1`, `HDMI-A-1`).
    pub device_name: String,

    /// Whether this is the primary display.
    #[serde(default)]
    pub primary: bool,

    /// Connector the display is attached to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
}

impl OutputDescriptor {
    pub fn new(device_name: impl Into<String>, primary: bool) -> Self {
        Self {
            device_name: device_name.into(),
            primary,
            connector: None,
        }
    }
}

/// One entry of the display subsystem's adapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// Human-readable adapter description.
    pub description: String,

    pub vendor_id: u16,
    pub device_id: u16,

    /// Native adapter identifier, if the display subsystem has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<HardwareId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci: Option<PciAddress>,

    /// Kernel/driver name bound to the device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Outputs in the order the display subsystem reports them.
    #[serde(default)]
    pub outputs: Vec<OutputDescriptor>,
}

impl AdapterDescriptor {
    pub fn new(description: impl Into<String>, vendor_id: u16, device_id: u16) -> Self {
        Self {
            description: description.into(),
            vendor_id,
            device_id,
            hardware_id: None,
            pci: None,
            driver: None,
            outputs: Vec::new(),
        }
    }

    pub fn with_hardware_id(mut self, id: HardwareId) -> Self {
        self.hardware_id = Some(id);
        self
    }

    pub fn with_pci(mut self, pci: PciAddress) -> Self {
        self.pci = Some(pci);
        self
    }

    pub fn with_output(mut self, output: OutputDescriptor) -> Self {
        self.outputs.push(output);
        self
    }
}

/// A device as reported by the graphics API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDevice {
    pub name: String,
    pub vendor_id: u16,
    pub device_id: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<HardwareId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pci: Option<PciAddress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_version: Option<String>,
}

impl PhysicalDevice {
    /// Graphics-API view of a display-subsystem adapter.
    pub fn matching(descriptor: &AdapterDescriptor) -> Self {
        Self {
            name: descriptor.description.clone(),
            vendor_id: descriptor.vendor_id,
            device_id: descriptor.device_id,
            hardware_id: descriptor.hardware_id,
            pci: descriptor.pci,
            driver_version: None,
        }
    }
}

/// A device as reported by the telemetry API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryDevice {
    pub pci: PciAddress,
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Snapshot of an initialized adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: Vendor,
    pub vendor_id: u16,
    pub device_id: u16,
    pub hardware_id: Option<HardwareId>,
    pub pci: Option<PciAddress>,
    pub driver: Option<String>,
    pub driver_version: Option<String>,
    pub telemetry: Option<TelemetryDevice>,
}

/// Snapshot of an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputInfo {
    pub device_name: String,
    pub primary: bool,
    pub connector: Option<String>,
}
