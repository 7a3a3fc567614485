//! Scripted in-memory backend.
//!
//! Describes a whole machine (display adapters, what the graphics API and
//! telemetry API can see, and which subsystems are reachable) as plain data,
//! loadable from JSON. Used by tests and by `gpumap --synthetic`.

use std::path::Path;
use std::sync::Arc;

use gpumap_common::error::{GpumapError, GpumapResult};
use serde::{Deserialize, Serialize};

use crate::adapter::CorrelatedAdapter;
use crate::traits::{Adapter, DisplayEnumerator, GraphicsApi, ResourceFactory, TelemetryApi};
use crate::types::{AdapterDescriptor, PciAddress, PhysicalDevice, TelemetryDevice};

/// A scripted machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSystem {
    /// Whether the display subsystem can be opened at all.
    pub display_subsystem: bool,
    pub graphics_available: bool,
    pub telemetry_available: bool,

    /// Display-subsystem adapter list, in enumeration order.
    pub adapters: Vec<AdapterDescriptor>,

    /// Devices the graphics API reports.
    pub graphics_devices: Vec<PhysicalDevice>,

    /// Devices the telemetry API manages.
    pub telemetry_devices: Vec<TelemetryDevice>,
}

impl Default for SyntheticSystem {
    fn default() -> Self {
        Self {
            display_subsystem: true,
            graphics_available: true,
            telemetry_available: false,
            adapters: Vec::new(),
            graphics_devices: Vec::new(),
            telemetry_devices: Vec::new(),
        }
    }
}

impl SyntheticSystem {
    /// Add a display adapter the graphics API can also see.
    pub fn with_adapter(mut self, descriptor: AdapterDescriptor) -> Self {
        self.graphics_devices.push(PhysicalDevice::matching(&descriptor));
        self.adapters.push(descriptor);
        self
    }

    /// Add a display adapter with no graphics-API counterpart. Adapters built
    /// for it fail to initialize.
    pub fn with_display_only_adapter(mut self, descriptor: AdapterDescriptor) -> Self {
        self.adapters.push(descriptor);
        self
    }

    pub fn with_telemetry_device(mut self, device: TelemetryDevice) -> Self {
        self.telemetry_available = true;
        self.telemetry_devices.push(device);
        self
    }

    /// Parse a system description from JSON.
    pub fn from_json(json: &str) -> GpumapResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a system description from a JSON file.
    pub fn load(path: &Path) -> GpumapResult<Self> {
        if !path.exists() {
            return Err(GpumapError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// [`ResourceFactory`] over a [`SyntheticSystem`].
#[derive(Debug, Clone)]
pub struct SyntheticFactory {
    system: Arc<SyntheticSystem>,
}

impl SyntheticFactory {
    pub fn new(system: SyntheticSystem) -> Self {
        Self {
            system: Arc::new(system),
        }
    }
}

impl ResourceFactory for SyntheticFactory {
    fn create_display_enumerator(&self) -> Option<Box<dyn DisplayEnumerator>> {
        if !self.system.display_subsystem {
            return None;
        }
        Some(Box::new(SyntheticEnumerator(self.system.clone())))
    }

    fn create_graphics_api(&self) -> Arc<dyn GraphicsApi> {
        Arc::new(SyntheticGraphics(self.system.clone()))
    }

    fn create_telemetry(&self) -> Arc<dyn TelemetryApi> {
        Arc::new(SyntheticTelemetry(self.system.clone()))
    }

    fn create_adapter(
        &self,
        graphics: Arc<dyn GraphicsApi>,
        telemetry: Arc<dyn TelemetryApi>,
    ) -> Box<dyn Adapter> {
        Box::new(CorrelatedAdapter::new(graphics, telemetry))
    }
}

struct SyntheticEnumerator(Arc<SyntheticSystem>);

impl DisplayEnumerator for SyntheticEnumerator {
    fn adapter_at(&self, index: u32) -> Option<AdapterDescriptor> {
        self.0.adapters.get(index as usize).cloned()
    }
}

struct SyntheticGraphics(Arc<SyntheticSystem>);

impl GraphicsApi for SyntheticGraphics {
    fn is_available(&self) -> bool {
        self.0.graphics_available
    }

    fn name(&self) -> &str {
        "synthetic-graphics"
    }

    fn physical_devices(&self) -> Vec<PhysicalDevice> {
        if self.0.graphics_available {
            self.0.graphics_devices.clone()
        } else {
            Vec::new()
        }
    }
}

struct SyntheticTelemetry(Arc<SyntheticSystem>);

impl TelemetryApi for SyntheticTelemetry {
    fn is_available(&self) -> bool {
        self.0.telemetry_available
    }

    fn name(&self) -> &str {
        "synthetic-telemetry"
    }

    fn device(&self, pci: &PciAddress) -> Option<TelemetryDevice> {
        if !self.0.telemetry_available {
            return None;
        }
        self.0
            .telemetry_devices
            .iter()
            .find(|d| d.pci == *pci)
            .cloned()
    }
}
