//! # cask-build
//!
//! Declarative container-system image builds.
//!
//! An image section either describes a plain layered build (delegated to a
//! [`LayeredImageBuilder`]) or a *container system*: a root container plus
//! auxiliary containers it takes volumes or network links from. A container
//! system build brings the auxiliaries up, runs the root to completion, then
//! applies each container's disposition — discard it, commit its filesystem
//! to an image, or persist its volume data into a new image via the
//! extraction workaround — and finally removes every container it created,
//! on success and on failure alike.
//!
//! ```text
//! ImageConfig ──parse──▶ SystemPlan ──▶ ContainerSystem::run
//!                                          │  bring up auxiliaries
//!                                          │  run root, block on exit
//!                                          │  commit / persist
//!                                          └─ remove everything
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod disposition;
pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod persist;
pub mod system;

pub use batch::{build_images, LayeredImageBuilder};
pub use config::ImageConfig;
pub use disposition::Disposition;
pub use error::{BuildError, Result};
pub use orchestrator::{BuiltImage, ContainerSystem};
pub use parse::{parse_dir_spec, parse_link_spec, parse_volume_from_spec};
pub use persist::PersistExtractor;
pub use system::{MemberKind, SystemMember, SystemPlan};
