//! Adapter that correlates a display-subsystem entry with the graphics-API
//! and telemetry views of the same physical device.

use std::sync::Arc;

use tracing::debug;

use crate::traits::{Adapter, GraphicsApi, Output, TelemetryApi};
use crate::types::{
    AdapterDescriptor, AdapterInfo, HardwareId, OutputDescriptor, OutputInfo, PhysicalDevice,
    Vendor,
};

/// Default [`Adapter`] implementation used by the bundled backends.
///
/// Initialization succeeds only when the graphics API can drive the device;
/// telemetry is attached when available but never required.
pub struct CorrelatedAdapter {
    graphics: Arc<dyn GraphicsApi>,
    telemetry: Arc<dyn TelemetryApi>,
    info: Option<AdapterInfo>,
}

impl CorrelatedAdapter {
    pub fn new(graphics: Arc<dyn GraphicsApi>, telemetry: Arc<dyn TelemetryApi>) -> Self {
        Self {
            graphics,
            telemetry,
            info: None,
        }
    }
}

impl Adapter for CorrelatedAdapter {
    fn initialize(
        &mut self,
        entry: &AdapterDescriptor,
        outputs: &mut Vec<Box<dyn Output>>,
    ) -> bool {
        if self.info.is_some() {
            return false;
        }

        let devices = self.graphics.physical_devices();
        let Some(device) = find_physical_device(entry, &devices) else {
            debug!(
                adapter = %entry.description,
                api = self.graphics.name(),
                "No graphics device matches display adapter, skipping"
            );
            return false;
        };

        let telemetry = match entry.pci.or(device.pci) {
            Some(pci) if self.telemetry.is_available() => self.telemetry.device(&pci),
            _ => None,
        };

        let info = AdapterInfo {
            name: entry.description.clone(),
            vendor: Vendor::from_pci_id(entry.vendor_id),
            vendor_id: entry.vendor_id,
            device_id: entry.device_id,
            hardware_id: entry.hardware_id.or(device.hardware_id),
            pci: entry.pci.or(device.pci),
            driver: entry.driver.clone(),
            driver_version: device.driver_version.clone(),
            telemetry,
        };

        debug!(
            adapter = %info.name,
            device = %device.name,
            outputs = entry.outputs.len(),
            telemetry = info.telemetry.is_some(),
            "Adapter correlated"
        );

        outputs.extend(
            entry
                .outputs
                .iter()
                .cloned()
                .map(|o| Box::new(MonitorOutput::new(o)) as Box<dyn Output>),
        );
        self.info = Some(info);
        true
    }

    fn hardware_id(&self) -> Option<HardwareId> {
        self.info.as_ref().and_then(|info| info.hardware_id)
    }

    fn name(&self) -> &str {
        self.info.as_ref().map_or("", |info| info.name.as_str())
    }

    fn info(&self) -> AdapterInfo {
        self.info.clone().unwrap_or_else(|| AdapterInfo {
            name: String::new(),
            vendor: Vendor::Other(0),
            vendor_id: 0,
            device_id: 0,
            hardware_id: None,
            pci: None,
            driver: None,
            driver_version: None,
            telemetry: None,
        })
    }
}

/// Pick the graphics-API device describing the same hardware as `entry`.
///
/// Matching order: hardware id, then PCI address, then vendor/device ids.
/// The id fallback takes the first device, so identical boards without bus
/// information resolve to the same device.
pub fn find_physical_device<'a>(
    entry: &AdapterDescriptor,
    devices: &'a [PhysicalDevice],
) -> Option<&'a PhysicalDevice> {
    if let Some(id) = entry.hardware_id {
        if let Some(device) = devices.iter().find(|d| d.hardware_id == Some(id)) {
            return Some(device);
        }
    }

    if let Some(pci) = entry.pci {
        if let Some(device) = devices.iter().find(|d| d.pci == Some(pci)) {
            return Some(device);
        }
    }

    devices
        .iter()
        .find(|d| d.vendor_id == entry.vendor_id && d.device_id == entry.device_id)
}

/// [`Output`] built from a display-subsystem output descriptor.
#[derive(Debug, Clone)]
pub struct MonitorOutput {
    descriptor: OutputDescriptor,
}

impl MonitorOutput {
    pub fn new(descriptor: OutputDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Output for MonitorOutput {
    fn device_name(&self) -> &str {
        &self.descriptor.device_name
    }

    fn is_primary(&self) -> bool {
        self.descriptor.primary
    }

    fn info(&self) -> OutputInfo {
        OutputInfo {
            device_name: self.descriptor.device_name.clone(),
            primary: self.descriptor.primary,
            connector: self.descriptor.connector.clone(),
        }
    }
}
