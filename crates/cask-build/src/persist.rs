//! Volume persistence extraction.
//!
//! A commit snapshots only a container's own writable layer; data written
//! into bound or engine-managed volumes is invisible to it. Persist instead
//! runs a disposable helper container that archives the source's volume
//! paths into a bind-mounted extraction directory, then builds a new image
//! from the source's base image with that archive applied at the filesystem
//! root.

use crate::error::{BuildError, Result};
use crate::orchestrator::BuiltImage;
use cask_container::{
    AccessMode, Container, ContainerEngine, ContainerSpec, ImageBuild, VolumeFromLink, VolumeLink,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Utility image the extraction helper runs from.
pub const EXTRACT_IMAGE: &str = "busybox:latest";

const ARCHIVE_NAME: &str = "extract.tar";

/// Builds images from a container's externally-mounted volume data.
pub struct PersistExtractor {
    engine: Arc<dyn ContainerEngine>,
}

impl PersistExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Archives `source`'s volume contents and builds them into a new image
    /// tagged `target`.
    ///
    /// The helper container attaches to the source's volumes read-only, so
    /// the source (and everything it depends on) must still exist; callers
    /// must run extraction strictly before teardown.
    ///
    /// # Errors
    ///
    /// [`BuildError::NothingToPersist`] when the source declares no
    /// volumes, [`cask_container::ContainerError::Exit`] when the helper
    /// exits non-zero, plus engine and I/O failures.
    pub async fn persist(&self, source: &Container, target: &str) -> Result<BuiltImage> {
        info!(container = %source.name(), target, "persisting container volume data");
        let inspect = self.engine.inspect(source.name()).await?;
        if inspect.volumes.is_empty() {
            return Err(BuildError::NothingToPersist {
                container: source.name().to_string(),
                target: target.to_string(),
            });
        }

        // busybox tar rejects absolute member paths
        let volume_paths = inspect
            .volumes
            .iter()
            .map(|path| path.trim_start_matches('/').to_string());

        let extract_dir = tempfile::tempdir()?;
        let mount_point = format!("/{}", &Uuid::new_v4().simple().to_string()[..8]);
        let archive_path = format!("{mount_point}/{ARCHIVE_NAME}");

        let mut spec = ContainerSpec::temp(EXTRACT_IMAGE);
        spec.detach = false;
        spec.command = ["tar", "-cf", archive_path.as_str()]
            .into_iter()
            .map(String::from)
            .chain(volume_paths)
            .collect();
        spec.volumes.push(VolumeLink::bind(
            extract_dir.path().display().to_string(),
            mount_point,
        ));
        spec.volumes_from
            .push(VolumeFromLink::new(source.name(), AccessMode::Ro));

        let helper = Container::new(self.engine.clone(), spec);
        debug!(helper = %helper.name(), container = %source.name(), "extracting volume data");
        let run = helper.init().await;
        let removed = helper.remove().await;
        run?;
        removed?;

        info!(target, base = %source.image(), "building image from extracted volume data");
        let id = self
            .engine
            .build(ImageBuild {
                base_image: source.image().to_string(),
                tag: target.to_string(),
                archive: extract_dir.path().join(ARCHIVE_NAME),
            })
            .await?;
        Ok(BuiltImage {
            tag: target.to_string(),
            id,
        })
    }
}
