//! Container specifications.
//!
//! A [`ContainerSpec`] is the declarative description of one container:
//! image, name, overrides, and its relations to other containers (volume
//! binds, volumes-from references, network links). Specs are materialized
//! into live containers by [`crate::Container`].

use crate::hooks::HookRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error parsing one of the colon/equals separated record formats.
#[derive(Debug, Error)]
#[error("invalid {kind} spec '{text}'")]
pub struct SpecParseError {
    kind: &'static str,
    text: String,
}

impl SpecParseError {
    fn new(kind: &'static str, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub key: String,
    /// Variable value.
    pub value: String,
}

impl EnvVar {
    /// Creates an environment variable.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl FromStr for EnvVar {
    type Err = SpecParseError;

    /// Parses `KEY=VALUE`, splitting on the first `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| SpecParseError::new("env", s))?;
        Ok(Self::new(key, value))
    }
}

impl std::fmt::Display for EnvVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// A volume mount.
///
/// Without a host path the engine manages an anonymous volume at the
/// container path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeLink {
    /// Host path backing the mount, if any.
    pub host_path: Option<String>,
    /// Mount path inside the container.
    pub container_path: String,
    /// Whether the mount is read-only.
    pub read_only: bool,
}

impl VolumeLink {
    /// Creates a host-backed volume mount.
    pub fn bind(host_path: impl Into<String>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: Some(host_path.into()),
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// Creates an engine-managed anonymous volume.
    pub fn anonymous(container_path: impl Into<String>) -> Self {
        Self {
            host_path: None,
            container_path: container_path.into(),
            read_only: false,
        }
    }

    /// Marks the mount read-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl FromStr for VolumeLink {
    type Err = SpecParseError;

    /// Parses `HOST:CONTAINER` or a bare `CONTAINER` path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>()[..] {
            [container] => Ok(Self::anonymous(container)),
            [host, container] => Ok(Self::bind(host, container)),
            _ => Err(SpecParseError::new("volume", s)),
        }
    }
}

/// Access mode of a volumes-from reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read-only.
    Ro,
    /// Read-write.
    Rw,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ro => write!(f, "ro"),
            Self::Rw => write!(f, "rw"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = SpecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(Self::Ro),
            "rw" => Ok(Self::Rw),
            _ => Err(SpecParseError::new("access mode", s)),
        }
    }
}

/// A volumes-from reference to another container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeFromLink {
    /// Name of the source container.
    pub container_name: String,
    /// Access mode granted on the source's volumes.
    pub mode: AccessMode,
}

impl VolumeFromLink {
    /// Creates a volumes-from reference.
    pub fn new(container_name: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            container_name: container_name.into(),
            mode,
        }
    }
}

impl FromStr for VolumeFromLink {
    type Err = SpecParseError;

    /// Parses `NAME:ro` or `NAME:rw`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, mode) = s
            .split_once(':')
            .ok_or_else(|| SpecParseError::new("volumes-from", s))?;
        let mode = mode
            .parse()
            .map_err(|_| SpecParseError::new("volumes-from", s))?;
        Ok(Self::new(name, mode))
    }
}

impl std::fmt::Display for VolumeFromLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.container_name, self.mode)
    }
}

/// A network link to another container, visible under an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkLink {
    /// Name of the linked container.
    pub container_name: String,
    /// Alias the linked container is reachable as.
    pub alias: String,
}

impl NetworkLink {
    /// Creates a network link.
    pub fn new(container_name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            alias: alias.into(),
        }
    }
}

impl FromStr for NetworkLink {
    type Err = SpecParseError;

    /// Parses `NAME:ALIAS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, alias) = s
            .split_once(':')
            .ok_or_else(|| SpecParseError::new("link", s))?;
        Ok(Self::new(name, alias))
    }
}

impl std::fmt::Display for NetworkLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.container_name, self.alias)
    }
}

/// Declarative description of one container.
///
/// Every constructor allocates fresh empty collections; spec instances never
/// share list state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Image reference the container is created from.
    pub image: String,
    /// Container name, unique within one build run.
    pub name: String,
    /// Whether start returns immediately instead of blocking on exit.
    pub detach: bool,
    /// Whether the container may only ever be started once.
    pub run_once: bool,
    /// Entrypoint override.
    pub entrypoint: Option<String>,
    /// Working directory override.
    pub working_dir: Option<String>,
    /// Capabilities to add.
    pub cap_add: Vec<String>,
    /// Capabilities to drop.
    pub cap_drop: Vec<String>,
    /// Command to run.
    pub command: Vec<String>,
    /// Environment variables.
    pub env: Vec<EnvVar>,
    /// Volume mounts.
    pub volumes: Vec<VolumeLink>,
    /// Volumes-from references.
    pub volumes_from: Vec<VolumeFromLink>,
    /// Network links.
    pub links: Vec<NetworkLink>,
    /// Lifecycle hooks, fired around state transitions.
    #[serde(skip)]
    pub hooks: HookRegistry,
}

impl ContainerSpec {
    /// Creates a spec with a random name.
    pub fn new(image: impl Into<String>) -> Self {
        let image = image.into();
        let name = Self::random_name();
        Self::named(image, name)
    }

    /// Creates a spec with an explicit name.
    pub fn named(image: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            name: name.into(),
            detach: true,
            run_once: false,
            entrypoint: None,
            working_dir: None,
            cap_add: Vec::new(),
            cap_drop: Vec::new(),
            command: Vec::new(),
            env: Vec::new(),
            volumes: Vec::new(),
            volumes_from: Vec::new(),
            links: Vec::new(),
            hooks: HookRegistry::default(),
        }
    }

    /// Creates a spec for a temporary container, named after its image plus
    /// a short random suffix.
    pub fn temp(image: impl Into<String>) -> Self {
        let image = image.into();
        let base = image.split(':').next().unwrap_or(&image).to_string();
        let name = format!("{base}.{}", &Self::random_name()[..8]);
        Self::named(image, name)
    }

    /// Generates a random container name.
    #[must_use]
    pub fn random_name() -> String {
        Uuid::new_v4().to_string()
    }

    /// Names of the containers this spec depends on, via links and
    /// volumes-from references.
    #[must_use]
    pub fn dependency_names(&self) -> BTreeSet<String> {
        self.links
            .iter()
            .map(|l| l.container_name.clone())
            .chain(self.volumes_from.iter().map(|v| v.container_name.clone()))
            .collect()
    }
}

impl std::fmt::Display for ContainerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
