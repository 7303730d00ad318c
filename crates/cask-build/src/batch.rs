//! Multi-image build driver.
//!
//! Image sections are built sequentially. Sections carrying container-system
//! keys (`volumes_from`, `links`, `commit`) run a [`ContainerSystem`];
//! everything else is a plain layered build, delegated to the host
//! application's [`LayeredImageBuilder`]. One image's failure stops the
//! batch but does not roll back images already built.

use crate::config::ImageConfig;
use crate::error::{BuildError, Result};
use crate::orchestrator::{BuiltImage, ContainerSystem};
use crate::system::SystemPlan;
use async_trait::async_trait;
use cask_container::ContainerEngine;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// The plain Dockerfile-style build path (context assembly, layering).
///
/// Provided by the host application; the container-system orchestrator does
/// not implement it.
#[async_trait]
pub trait LayeredImageBuilder: Send + Sync {
    /// Builds a single layered image from its configuration.
    async fn build_image(&self, image: &str, config: &ImageConfig) -> Result<BuiltImage>;
}

/// Builds the named images from their configuration sections, in order.
///
/// # Errors
///
/// Fails on the first image whose build fails; images built before it
/// remain valid.
pub async fn build_images(
    engine: Arc<dyn ContainerEngine>,
    layered: &dyn LayeredImageBuilder,
    config: &BTreeMap<String, ImageConfig>,
    images: &[&str],
) -> Result<Vec<BuiltImage>> {
    info!("building {} image(s)", images.len());
    let mut built = Vec::new();
    for &image in images {
        let section = config
            .get(image)
            .ok_or_else(|| BuildError::config(image, "no such image section"))?;
        debug!(image, "processing image");
        if section.is_container_system() {
            let plan = SystemPlan::from_config(image, section)?;
            let system = ContainerSystem::new(engine.clone(), plan)?;
            built.extend(system.run().await?);
        } else {
            built.push(layered.build_image(image, section).await?);
        }
    }
    info!("done");
    Ok(built)
}
