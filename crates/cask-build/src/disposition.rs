//! Post-build container dispositions.

use serde::{Deserialize, Serialize};

/// What happens to a container after a successful build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Remove the container, keep nothing.
    Discard,
    /// Snapshot the container's filesystem into the tagged image.
    Commit(String),
    /// Extract the container's volume data into the tagged image.
    ///
    /// A commit cannot capture externally mounted volume data; persist runs
    /// the extraction workaround instead.
    Persist(String),
}

impl Disposition {
    /// Returns whether the container leaves no image behind.
    #[must_use]
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discard => write!(f, "discard"),
            Self::Commit(tag) => write!(f, "commit to {tag}"),
            Self::Persist(tag) => write!(f, "persist to {tag}"),
        }
    }
}
