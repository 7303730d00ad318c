//! # cask-container
//!
//! Container engine abstraction and lifecycle management for Cask.
//!
//! This crate provides the two building blocks the build layer is made of:
//!
//! - [`ContainerEngine`] — an async trait abstracting the remote container
//!   engine (create, start, signal, wait, remove, inspect, logs, commit,
//!   build). Engine outcomes such as "not found" and "already exists" are
//!   modeled as explicit [`EngineError`] variants so callers can make
//!   idempotency decisions structurally.
//! - [`Container`] — a lifecycle wrapper around one engine-side container,
//!   driving it through `create → start → wait → stop → remove` with a typed
//!   hook registry fired around every transition.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Container                   │
//! │   create / start / wait / stop / remove      │
//! │   (pre/post hooks around each transition)    │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │          dyn ContainerEngine (remote)        │
//! └──────────────────────────────────────────────┘
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod container;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod spec;

pub use container::{Container, STOP_WAIT};
pub use engine::{
    ContainerEngine, ContainerInspect, CreateOptions, EngineError, EngineResult, ImageBuild,
    Signal, StartOptions,
};
pub use error::{ContainerError, Result};
pub use hooks::{Event, HookRegistry, Phase};
pub use spec::{AccessMode, ContainerSpec, EnvVar, NetworkLink, VolumeFromLink, VolumeLink};
