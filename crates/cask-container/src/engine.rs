//! Container engine abstraction.
//!
//! The engine is the remote API that actually creates, runs and inspects
//! containers. Everything above it talks to `dyn ContainerEngine`, which
//! keeps the lifecycle and orchestration code independent of any particular
//! wire protocol and lets tests substitute a mock.

use crate::spec::{NetworkLink, VolumeFromLink, VolumeLink};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Errors reported by the container engine.
///
/// `NotFound` and `AlreadyExists` are first-class variants rather than
/// status codes buried in an opaque payload: the lifecycle layer tolerates
/// them in specific places (idempotent create/remove, stop of a gone
/// container) and those decisions are made by matching on the variant.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The named container does not exist.
    #[error("no such container: {0}")]
    NotFound(String),

    /// A container with this name already exists.
    #[error("container already exists: {0}")]
    AlreadyExists(String),

    /// A wait did not complete within the given timeout.
    #[error("wait for container {name} timed out after {timeout:?}")]
    WaitTimeout { name: String, timeout: Duration },

    /// Any other engine failure. Always fatal.
    #[error("engine error: {0}")]
    Api(String),

    /// I/O error talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Returns whether this is the tolerated not-found outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns whether this is the tolerated already-exists outcome.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    /// Returns whether this is a wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout { .. })
    }
}

/// Signal kinds used by the stop escalation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Graceful termination (SIGTERM).
    Term,
    /// Forceful termination (SIGKILL).
    Kill,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Term => write!(f, "TERM"),
            Self::Kill => write!(f, "KILL"),
        }
    }
}

/// Parameters for creating a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Container name.
    pub name: String,
    /// Image reference to create from.
    pub image: String,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Working directory override.
    pub working_dir: Option<String>,
    /// Command to run.
    pub command: Vec<String>,
    /// Environment variables, `KEY=VALUE` formatted.
    pub env: Vec<String>,
    /// Container-side volume paths to declare.
    pub volumes: Vec<String>,
}

/// Parameters for starting a created container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartOptions {
    /// Capabilities to add.
    pub cap_add: Vec<String>,
    /// Capabilities to drop.
    pub cap_drop: Vec<String>,
    /// Host-backed volume binds.
    pub binds: Vec<VolumeLink>,
    /// Network links to other containers.
    pub links: Vec<NetworkLink>,
    /// Volumes-from references to other containers.
    pub volumes_from: Vec<VolumeFromLink>,
}

/// State snapshot returned by [`ContainerEngine::inspect`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerInspect {
    /// Container name.
    pub name: String,
    /// Image the container was created from.
    pub image: String,
    /// Whether the main process is currently running.
    pub running: bool,
    /// Process ID of the main process, 0 when not running.
    pub pid: i64,
    /// Exit code of the last run, if any.
    pub exit_code: Option<i64>,
    /// When the container was last started. `None` means the container has
    /// never been started (the engine's zero-timestamp sentinel).
    pub started_at: Option<DateTime<Utc>>,
    /// Volume mount paths declared by the container, as seen in-container.
    pub volumes: Vec<String>,
}

/// Parameters for building an image from an archive layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBuild {
    /// Base image for the new image.
    pub base_image: String,
    /// Tag for the new image.
    pub tag: String,
    /// Host path of an archive applied at the filesystem root.
    pub archive: PathBuf,
}

/// Remote container engine capability surface.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Creates a container, returning its engine-side ID.
    async fn create(&self, options: CreateOptions) -> EngineResult<String>;

    /// Starts a created container.
    async fn start(&self, name: &str, options: StartOptions) -> EngineResult<()>;

    /// Sends a signal to a running container.
    async fn signal(&self, name: &str, signal: Signal) -> EngineResult<()>;

    /// Blocks until the container exits, returning its exit code.
    ///
    /// With a timeout, [`EngineError::WaitTimeout`] is returned when the
    /// container is still running once the timeout elapses.
    async fn wait(&self, name: &str, timeout: Option<Duration>) -> EngineResult<i64>;

    /// Removes a container.
    async fn remove(&self, name: &str, force: bool) -> EngineResult<()>;

    /// Returns a state snapshot of a container.
    async fn inspect(&self, name: &str) -> EngineResult<ContainerInspect>;

    /// Returns the captured output of a container.
    async fn logs(&self, name: &str) -> EngineResult<Vec<u8>>;

    /// Snapshots a container's filesystem into a new image tag, returning
    /// the image ID.
    async fn commit(&self, name: &str, tag: &str) -> EngineResult<String>;

    /// Builds a new image from a base image plus one archive layer,
    /// returning the image ID.
    async fn build(&self, build: ImageBuild) -> EngineResult<String>;
}
