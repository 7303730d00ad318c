//! Container system planning.
//!
//! A [`SystemPlan`] is the resolved shape of one container-system build: the
//! root container spec, the auxiliary members it depends on, and each
//! container's disposition. Plans validate their dependency graph — names
//! must be unique, every reference must resolve to a member, and the member
//! graph must be acyclic — before any container is created.

use crate::config::ImageConfig;
use crate::disposition::Disposition;
use crate::error::{BuildError, Result};
use crate::parse::{parse_dir_spec, parse_link_spec, parse_volume_from_spec};
use cask_container::{AccessMode, ContainerSpec, NetworkLink, VolumeFromLink, VolumeLink};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// How an auxiliary member relates to the root container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Supplies volume data; brought up to completion before the root runs.
    VolumesFrom,
    /// Supplies network reachability; runs detached alongside the root.
    Link,
}

/// One auxiliary container of a system.
#[derive(Debug, Clone)]
pub struct SystemMember {
    /// The member's container spec.
    pub spec: ContainerSpec,
    /// The member's post-build disposition.
    pub disposition: Disposition,
    /// Relation to the root container.
    pub kind: MemberKind,
}

/// The resolved plan of one container-system build.
#[derive(Debug, Clone)]
pub struct SystemPlan {
    /// Name of the image section being built.
    pub image: String,
    /// Root container spec.
    pub root: ContainerSpec,
    /// Root container disposition.
    pub root_disposition: Disposition,
    /// Auxiliary members.
    pub members: Vec<SystemMember>,
}

impl SystemPlan {
    /// Creates a plan with no members and a discarded root.
    pub fn new(image: impl Into<String>, root: ContainerSpec) -> Self {
        Self {
            image: image.into(),
            root,
            root_disposition: Disposition::Discard,
            members: Vec::new(),
        }
    }

    /// Resolves an image section into a plan.
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidFormat`] for malformed spec lines and
    /// [`BuildError::Config`] for missing keys or an inconsistent
    /// dependency graph.
    pub fn from_config(image: &str, config: &ImageConfig) -> Result<Self> {
        let base = config.require("from", image)?;
        let mut root = ContainerSpec::temp(base);
        root.detach = false;

        let mut plan = Self::new(image, root);
        if config.flag("commit") {
            debug!(image, "root container will be committed");
            plan.root_disposition = Disposition::Commit(image.to_string());
        }

        if let Some(spec) = config.get("entrypoint") {
            let paths = parse_dir_spec(spec, "entrypoint", image)?;
            let dest = paths.dest_path.display().to_string();
            plan.root.working_dir = Some(paths.dest_dir.display().to_string());
            plan.root.entrypoint = Some(dest.clone());
            plan.root
                .volumes
                .push(VolumeLink::bind(paths.source.display().to_string(), dest));
        }

        for line in config.optional_plural("envs") {
            let env = line
                .parse()
                .map_err(|_| BuildError::invalid_format("env", line, image))?;
            plan.root.env.push(env);
        }

        for spec in config.optional_plural("libs") {
            let paths = parse_dir_spec(spec, "lib", image)?;
            plan.root.volumes.push(VolumeLink::bind(
                paths.source.display().to_string(),
                paths.dest_path.display().to_string(),
            ));
        }

        for spec in config.optional_plural("volumes_from") {
            let parsed = parse_volume_from_spec(spec, "volumes_from", image)?;
            let name = plan.add_volumes_from(ContainerSpec::temp(&parsed.image), parsed.disposition);
            debug!(image, container = %name, "root container will have volumes from container");
        }

        for spec in config.optional_plural("links") {
            let parsed = parse_link_spec(spec, "links", image)?;
            let name = plan.add_link(
                ContainerSpec::temp(&parsed.image),
                &parsed.alias,
                parsed.disposition,
            );
            debug!(image, container = %name, "root container will be linked to container");
        }

        plan.validate()?;
        Ok(plan)
    }

    /// Adds a volumes-from member and wires the root to it read-write.
    /// Returns the member's container name.
    pub fn add_volumes_from(&mut self, mut spec: ContainerSpec, disposition: Disposition) -> String {
        spec.detach = false;
        let name = spec.name.clone();
        self.root
            .volumes_from
            .push(VolumeFromLink::new(&name, AccessMode::Rw));
        self.members.push(SystemMember {
            spec,
            disposition,
            kind: MemberKind::VolumesFrom,
        });
        name
    }

    /// Adds a detached link member and wires the root to it under `alias`.
    /// Returns the member's container name.
    pub fn add_link(
        &mut self,
        mut spec: ContainerSpec,
        alias: &str,
        disposition: Disposition,
    ) -> String {
        spec.detach = true;
        let name = spec.name.clone();
        self.root.links.push(NetworkLink::new(&name, alias));
        self.members.push(SystemMember {
            spec,
            disposition,
            kind: MemberKind::Link,
        });
        name
    }

    /// Validates the plan's dependency graph.
    ///
    /// # Errors
    ///
    /// [`BuildError::Config`] on duplicate names, references to unknown
    /// containers, or a dependency cycle.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in std::iter::once(&self.root.name).chain(self.members.iter().map(|m| &m.spec.name))
        {
            if !seen.insert(name.as_str()) {
                return Err(BuildError::config(
                    &self.image,
                    format!("duplicate container name {name}"),
                ));
            }
        }

        let index = self.member_index();
        for dep in self.root.dependency_names() {
            if !index.contains_key(dep.as_str()) {
                return Err(BuildError::config(
                    &self.image,
                    format!("root container references unknown container {dep}"),
                ));
            }
        }

        self.start_order().map(|_| ())
    }

    /// Member indices in bring-up order: every member comes after the
    /// members it depends on.
    ///
    /// # Errors
    ///
    /// [`BuildError::Config`] on unknown references or cycles.
    pub fn start_order(&self) -> Result<Vec<usize>> {
        let index = self.member_index();
        let mut state = vec![VisitState::Unvisited; self.members.len()];
        let mut order = Vec::with_capacity(self.members.len());
        for i in 0..self.members.len() {
            self.visit(i, &index, &mut state, &mut order)?;
        }
        Ok(order)
    }

    fn member_index(&self) -> BTreeMap<&str, usize> {
        self.members
            .iter()
            .enumerate()
            .map(|(i, m)| (m.spec.name.as_str(), i))
            .collect()
    }

    fn visit(
        &self,
        i: usize,
        index: &BTreeMap<&str, usize>,
        state: &mut [VisitState],
        order: &mut Vec<usize>,
    ) -> Result<()> {
        match state[i] {
            VisitState::Done => return Ok(()),
            VisitState::Visiting => {
                return Err(BuildError::config(
                    &self.image,
                    format!(
                        "dependency cycle involving container {}",
                        self.members[i].spec.name
                    ),
                ));
            }
            VisitState::Unvisited => {}
        }
        state[i] = VisitState::Visiting;
        for dep in self.members[i].spec.dependency_names() {
            let j = *index.get(dep.as_str()).ok_or_else(|| {
                BuildError::config(
                    &self.image,
                    format!(
                        "container {} references unknown container {dep}",
                        self.members[i].spec.name
                    ),
                )
            })?;
            self.visit(j, index, state, order)?;
        }
        state[i] = VisitState::Done;
        order.push(i);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Visiting,
    Done,
}
