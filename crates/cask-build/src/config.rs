//! Image configuration view.
//!
//! Loading the configuration file is the host application's concern; this
//! module only defines the per-image key/value view the build layer
//! consumes. "Optional plural" keys hold zero or more newline-separated
//! spec lines; an absent key is an empty sequence, not an error.

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keys whose presence marks an image section as a container-system build.
pub const CONTAINER_SYSTEM_KEYS: [&str; 3] = ["volumes_from", "links", "commit"];

/// One image section of the build configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageConfig {
    values: BTreeMap<String, String>,
}

impl ImageConfig {
    /// Creates an empty section.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns a key's value, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns a required key's value.
    ///
    /// # Errors
    ///
    /// [`BuildError::Config`] when the key is absent.
    pub fn require(&self, key: &str, image: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| BuildError::config(image, format!("missing required key '{key}'")))
    }

    /// Returns whether a boolean key is set truthy.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(str::trim),
            Some("true" | "yes" | "on" | "1")
        )
    }

    /// Iterates the trimmed, non-empty lines of an optional plural key.
    pub fn optional_plural(&self, key: &str) -> impl Iterator<Item = &str> {
        self.get(key)
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }

    /// Returns whether this section describes a container-system build
    /// rather than a plain layered build.
    #[must_use]
    pub fn is_container_system(&self) -> bool {
        CONTAINER_SYSTEM_KEYS
            .iter()
            .any(|key| self.values.contains_key(*key))
    }
}

impl FromIterator<(String, String)> for ImageConfig {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
