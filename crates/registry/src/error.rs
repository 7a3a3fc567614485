//! Registry failures.

use gpumap_common::error::GpumapError;

/// Why the registry could not be initialized or could not answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("display subsystem is not accessible")]
    DisplaySubsystemUnavailable,

    #[error("graphics API '{api}' is not available")]
    GraphicsApiUnavailable { api: String },

    #[error("no usable adapters found ({discarded} discarded)")]
    NoAdapters { discarded: usize },

    #[error("registry has already been initialized")]
    AlreadyInitialized,

    #[error("registry holds no adapters")]
    Empty,
}

impl From<RegistryError> for GpumapError {
    fn from(err: RegistryError) -> Self {
        GpumapError::registry(err.to_string())
    }
}
