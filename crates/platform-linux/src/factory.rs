//! Linux [`ResourceFactory`]: DRM sysfs, Vulkan ICD manifests and NVIDIA procfs.

use std::sync::Arc;

use gpumap_common::config::DiscoveryConfig;
use gpumap_platform_core::{
    Adapter, CorrelatedAdapter, DisplayEnumerator, GraphicsApi, ResourceFactory, TelemetryApi,
};

use crate::display::SysfsDisplayEnumerator;
use crate::probes::{NvmlProbe, VulkanProbe};

pub struct LinuxFactory {
    config: DiscoveryConfig,
}

impl LinuxFactory {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }
}

impl ResourceFactory for LinuxFactory {
    fn create_display_enumerator(&self) -> Option<Box<dyn DisplayEnumerator>> {
        match SysfsDisplayEnumerator::open(&self.config.sysfs_root) {
            Ok(enumerator) => Some(Box::new(enumerator)),
            Err(e) => {
                tracing::warn!("Display subsystem unavailable: {}", e);
                None
            }
        }
    }

    fn create_graphics_api(&self) -> Arc<dyn GraphicsApi> {
        Arc::new(VulkanProbe::detect(&self.config))
    }

    fn create_telemetry(&self) -> Arc<dyn TelemetryApi> {
        Arc::new(NvmlProbe::detect(&self.config.procfs_root))
    }

    fn create_adapter(
        &self,
        graphics: Arc<dyn GraphicsApi>,
        telemetry: Arc<dyn TelemetryApi>,
    ) -> Box<dyn Adapter> {
        Box::new(CorrelatedAdapter::new(graphics, telemetry))
    }
}
