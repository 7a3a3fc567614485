//! Collaborator contracts consumed by the adapter registry.
//!
//! A backend implements [`ResourceFactory`]; the registry never constructs
//! platform objects itself.

use std::sync::Arc;

use crate::types::{AdapterDescriptor, AdapterInfo, HardwareId, OutputInfo, PciAddress};
use crate::types::{PhysicalDevice, TelemetryDevice};

/// Source of the platform objects the registry works with.
pub trait ResourceFactory: Send + Sync {
    /// Open the display subsystem. `None` means it is not accessible.
    fn create_display_enumerator(&self) -> Option<Box<dyn DisplayEnumerator>>;

    /// Graphics-API client. May report itself unavailable.
    fn create_graphics_api(&self) -> Arc<dyn GraphicsApi>;

    /// Telemetry client. May report itself unavailable.
    fn create_telemetry(&self) -> Arc<dyn TelemetryApi>;

    /// Construct an uninitialized adapter bound to both probe clients.
    fn create_adapter(
        &self,
        graphics: Arc<dyn GraphicsApi>,
        telemetry: Arc<dyn TelemetryApi>,
    ) -> Box<dyn Adapter>;
}

/// Indexed view of the display subsystem's adapter list.
pub trait DisplayEnumerator: Send + Sync {
    /// Adapter at `index`, or `None` once the list is exhausted.
    fn adapter_at(&self, index: u32) -> Option<AdapterDescriptor>;
}

/// Walk an enumerator from index 0 until it reports no more adapters.
pub fn display_adapters(
    enumerator: &dyn DisplayEnumerator,
) -> impl Iterator<Item = AdapterDescriptor> + '_ {
    let mut next = Some(0u32);
    std::iter::from_fn(move || {
        let index = next?;
        match enumerator.adapter_at(index) {
            Some(descriptor) => {
                next = index.checked_add(1);
                Some(descriptor)
            }
            None => {
                next = None;
                None
            }
        }
    })
}

/// Graphics-API client (Vulkan-equivalent).
pub trait GraphicsApi: Send + Sync {
    fn is_available(&self) -> bool;

    /// Client name for logging.
    fn name(&self) -> &str;

    /// Physical devices the API can drive. Empty when unavailable.
    fn physical_devices(&self) -> Vec<PhysicalDevice>;
}

/// Hardware telemetry client (NVML-equivalent).
pub trait TelemetryApi: Send + Sync {
    fn is_available(&self) -> bool;

    /// Client name for logging.
    fn name(&self) -> &str;

    /// Telemetry handle for the device at `pci`, if the API manages it.
    fn device(&self, pci: &PciAddress) -> Option<TelemetryDevice>;
}

/// One GPU as seen by the display subsystem and both probes.
pub trait Adapter: Send + Sync {
    /// Correlate with `entry` and append this adapter's outputs to `outputs`.
    ///
    /// Returns `false` when the adapter is not usable; the caller then drops
    /// the adapter together with anything it appended.
    fn initialize(&mut self, entry: &AdapterDescriptor, outputs: &mut Vec<Box<dyn Output>>)
        -> bool;

    fn hardware_id(&self) -> Option<HardwareId>;

    fn name(&self) -> &str;

    fn info(&self) -> AdapterInfo;
}

/// One display attached to an adapter.
pub trait Output: Send + Sync {
    fn device_name(&self) -> &str;

    fn is_primary(&self) -> bool;

    fn info(&self) -> OutputInfo {
        OutputInfo {
            device_name: self.device_name().to_string(),
            primary: self.is_primary(),
            connector: None,
        }
    }
}
