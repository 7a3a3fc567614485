//! Error types shared across gpumap crates.

use std::path::PathBuf;

/// Top-level error type for gpumap operations.
#[derive(Debug, thiserror::Error)]
pub enum GpumapError {
    #[error("Discovery error: {message}")]
    Discovery { message: String },

    #[error("Registry error: {message}")]
    Registry { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using GpumapError.
pub type GpumapResult<T> = Result<T, GpumapError>;

impl GpumapError {
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery {
            message: msg.into(),
        }
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_carry_message() {
        let err = GpumapError::discovery("no drm cards");
        assert_eq!(err.to_string(), "Discovery error: no drm cards");

        let err = GpumapError::registry("empty");
        assert!(matches!(err, GpumapError::Registry { .. }));
    }

    #[test]
    fn io_errors_convert_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: GpumapError = io.into();
        assert_eq!(err.to_string(), "missing");
    }
}
