//! Container system orchestration.
//!
//! [`ContainerSystem`] owns the live containers of one build run: the root
//! plus its auxiliary members. `run` brings the members up in dependency
//! order, runs the root to completion, applies dispositions on success, and
//! removes every container it created on every exit path — a failed build
//! must never leave containers behind.

use crate::disposition::Disposition;
use crate::error::Result;
use crate::persist::PersistExtractor;
use crate::system::SystemPlan;
use cask_container::{Container, ContainerEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// An image produced by a build run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltImage {
    /// Tag the image was given.
    pub tag: String,
    /// Engine-side image ID.
    pub id: String,
}

struct Member {
    container: Container,
    disposition: Disposition,
}

/// A live container system being driven through one build run.
pub struct ContainerSystem {
    engine: Arc<dyn ContainerEngine>,
    image: String,
    root: Container,
    root_disposition: Disposition,
    members: Vec<Member>,
    start_order: Vec<usize>,
}

impl ContainerSystem {
    /// Materializes a validated plan into container wrappers.
    ///
    /// # Errors
    ///
    /// [`crate::BuildError::Config`] when the plan's dependency graph is
    /// inconsistent. Nothing is created engine-side here.
    pub fn new(engine: Arc<dyn ContainerEngine>, plan: SystemPlan) -> Result<Self> {
        plan.validate()?;
        let start_order = plan.start_order()?;
        let root = Container::new(engine.clone(), plan.root);
        let members = plan
            .members
            .into_iter()
            .map(|member| Member {
                container: Container::new(engine.clone(), member.spec),
                disposition: member.disposition,
            })
            .collect();
        Ok(Self {
            engine,
            image: plan.image,
            root,
            root_disposition: plan.root_disposition,
            members,
            start_order,
        })
    }

    /// The root container.
    #[must_use]
    pub fn root(&self) -> &Container {
        &self.root
    }

    /// Runs the build and returns the images it produced.
    ///
    /// Every container created by this run is removed before returning,
    /// whether the run succeeded or failed.
    ///
    /// # Errors
    ///
    /// [`cask_container::ContainerError::Exit`] when the root or an
    /// extraction helper exits non-zero, plus any engine, hook or
    /// configuration failure. The error surfaces only after teardown.
    pub async fn run(self) -> Result<Vec<BuiltImage>> {
        info!(image = %self.image, "starting container system");
        let outcome = self.execute().await;
        let cleanup = self.teardown().await;
        match (outcome, cleanup) {
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            (Ok(images), Ok(())) => Ok(images),
        }
    }

    async fn execute(&self) -> Result<Vec<BuiltImage>> {
        // Volumes-from members run to completion here; link members come up
        // detached. Either way every dependency is ready before the root
        // starts.
        for &i in &self.start_order {
            self.members[i].container.init().await?;
        }

        info!(container = %self.root.name(), "waiting for root container to finish");
        self.root.init().await?;

        for member in &self.members {
            member.container.stop().await?;
        }

        let mut images = Vec::new();
        self.apply_disposition(&self.root, &self.root_disposition, &mut images)
            .await?;
        for member in &self.members {
            self.apply_disposition(&member.container, &member.disposition, &mut images)
                .await?;
        }

        info!(image = %self.image, "container system build complete");
        Ok(images)
    }

    async fn apply_disposition(
        &self,
        container: &Container,
        disposition: &Disposition,
        images: &mut Vec<BuiltImage>,
    ) -> Result<()> {
        match disposition {
            Disposition::Discard => {}
            Disposition::Commit(tag) => {
                info!(container = %container.name(), tag, "committing container");
                let id = self.engine.commit(container.name(), tag).await?;
                images.push(BuiltImage {
                    tag: tag.clone(),
                    id,
                });
            }
            Disposition::Persist(tag) => {
                let extractor = PersistExtractor::new(self.engine.clone());
                images.push(extractor.persist(container, tag).await?);
            }
        }
        Ok(())
    }

    /// Removes every container of the system, tolerating ones that are
    /// already gone. Attempts all removals even when one fails.
    async fn teardown(&self) -> Result<()> {
        debug!(image = %self.image, "removing containers");
        let mut first_error = None;
        let containers =
            std::iter::once(&self.root).chain(self.members.iter().map(|m| &m.container));
        for container in containers {
            if let Err(e) = container.remove().await {
                error!(container = %container.name(), "failed to remove container: {e}");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}
