pub mod check;
pub mod find;
pub mod list;
pub mod primary;

use std::path::PathBuf;

use anyhow::Context as _;
use gpumap_common::config::AppConfig;
use gpumap_platform_core::{SyntheticFactory, SyntheticSystem};
use gpumap_platform_linux::LinuxFactory;
use gpumap_registry::AdapterRegistry;

/// Settings shared by every command.
pub struct Context {
    pub config: AppConfig,
    pub synthetic: Option<PathBuf>,
}

impl Context {
    pub fn load(config: Option<PathBuf>, synthetic: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => AppConfig::load_from(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AppConfig::load(),
        };
        Ok(Self { config, synthetic })
    }

    /// Registry over the synthetic system when one was given, the host otherwise.
    /// Not yet initialized.
    pub fn registry(&self) -> anyhow::Result<AdapterRegistry> {
        match &self.synthetic {
            Some(path) => {
                let system = SyntheticSystem::load(path)
                    .with_context(|| format!("Failed to load synthetic system {}", path.display()))?;
                tracing::debug!(path = %path.display(), "Using synthetic system");
                Ok(AdapterRegistry::new(SyntheticFactory::new(system)))
            }
            None => Ok(AdapterRegistry::new(LinuxFactory::new(
                self.config.discovery.clone(),
            ))),
        }
    }

    /// Initialized registry; initialization failure is an error.
    pub fn initialized_registry(&self) -> anyhow::Result<AdapterRegistry> {
        let mut registry = self.registry()?;
        registry.initialize().context("Adapter discovery failed")?;
        Ok(registry)
    }
}
