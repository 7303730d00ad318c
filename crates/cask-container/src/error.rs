//! Error types for container operations.

use crate::engine::{ContainerInspect, EngineError};
use crate::hooks::{Event, HookError, Phase};
use thiserror::Error;

/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Errors that can occur while driving a container's lifecycle.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A container exited with a non-zero code.
    ///
    /// Carries the captured logs and an inspect snapshot taken at the time
    /// of the failure.
    #[error("container {name} exited with code {code}\n\nlogs:\n{logs}")]
    Exit {
        /// Container name.
        name: String,
        /// Exit code.
        code: i64,
        /// Captured container output.
        logs: String,
        /// State snapshot, if the container still existed.
        inspect: Option<ContainerInspect>,
    },

    /// A lifecycle hook failed, aborting the transition it was fired around.
    #[error("{phase} {event} hook failed for container {name}: {source}")]
    Hook {
        /// Container name.
        name: String,
        /// Hook phase.
        phase: Phase,
        /// Hook event.
        event: Event,
        /// The hook's own error.
        #[source]
        source: HookError,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Engine failure outside the tolerated not-found/already-exists cases.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
