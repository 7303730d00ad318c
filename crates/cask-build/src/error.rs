//! Error types for build operations.

use cask_container::{ContainerError, EngineError};
use thiserror::Error;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while building images.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A declarative spec string did not match its mini-language.
    ///
    /// Raised before any container exists.
    #[error("invalid {option} specification '{spec}' for image {image}")]
    InvalidFormat {
        /// Configuration option the spec came from.
        option: String,
        /// The raw spec text.
        spec: String,
        /// Image whose configuration carried the spec.
        image: String,
    },

    /// Image configuration is inconsistent (missing keys, duplicate or
    /// unknown container references, dependency cycles).
    #[error("configuration error for image {image}: {reason}")]
    Config {
        /// Image being built.
        image: String,
        /// What is wrong.
        reason: String,
    },

    /// A persist disposition found no volumes to extract.
    #[error("container {container} has no volumes to persist to {target}")]
    NothingToPersist {
        /// Source container.
        container: String,
        /// Requested target image.
        target: String,
    },

    /// Container lifecycle failure (includes non-zero root/helper exits).
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// I/O error preparing build inputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for BuildError {
    fn from(e: EngineError) -> Self {
        Self::Container(ContainerError::Engine(e))
    }
}

impl BuildError {
    pub(crate) fn invalid_format(option: &str, spec: &str, image: &str) -> Self {
        Self::InvalidFormat {
            option: option.to_string(),
            spec: spec.to_string(),
            image: image.to_string(),
        }
    }

    pub(crate) fn config(image: &str, reason: impl Into<String>) -> Self {
        Self::Config {
            image: image.to_string(),
            reason: reason.into(),
        }
    }
}
