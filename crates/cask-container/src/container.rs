//! Container lifecycle.
//!
//! [`Container`] wraps one engine-side container and drives it through
//! `Absent → Created → Running → Stopped → Removed`. Transitions are
//! idempotent where the engine lets them be: create tolerates an existing
//! container, stop and remove tolerate a missing one. Hooks registered on
//! the spec fire synchronously around every transition.

use crate::engine::{ContainerEngine, ContainerInspect, CreateOptions, Signal, StartOptions};
use crate::error::{ContainerError, Result};
use crate::hooks::{Event, Phase};
use crate::spec::ContainerSpec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// How long each step of the stop escalation waits for the container to
/// exit before moving on.
pub const STOP_WAIT: Duration = Duration::from_secs(20);

/// Lifecycle wrapper around one engine-side container.
pub struct Container {
    engine: Arc<dyn ContainerEngine>,
    spec: ContainerSpec,
}

impl Container {
    /// Creates a wrapper for the given spec. Nothing is created engine-side
    /// until [`Container::create`] is called.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, spec: ContainerSpec) -> Self {
        Self { engine, spec }
    }

    /// Container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Image the container is created from.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.spec.image
    }

    /// The underlying spec.
    #[must_use]
    pub fn spec(&self) -> &ContainerSpec {
        &self.spec
    }

    /// Mutable access to the underlying spec.
    ///
    /// Only meaningful before [`Container::create`].
    pub fn spec_mut(&mut self) -> &mut ContainerSpec {
        &mut self.spec
    }

    fn fire(&self, phase: Phase, event: Event) -> Result<()> {
        self.spec.hooks.fire(phase, event, &self.spec)
    }

    /// Creates and starts the container.
    ///
    /// For a non-detached spec this blocks until the container exits and
    /// fails on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Propagates create/start failures and hook errors.
    pub async fn init(&self) -> Result<()> {
        self.fire(Phase::Pre, Event::Init)?;
        debug!(container = %self.spec.name, "initializing container");
        self.create().await?;
        self.start().await?;
        self.fire(Phase::Post, Event::Init)?;
        Ok(())
    }

    /// Creates the container.
    ///
    /// Idempotent: an engine already-exists outcome short-circuits to
    /// success (and skips the `post create` hook).
    ///
    /// # Errors
    ///
    /// Any other engine failure is fatal.
    pub async fn create(&self) -> Result<()> {
        self.fire(Phase::Pre, Event::Create)?;
        debug!(container = %self.spec.name, "attempting to create container");
        match self.engine.create(self.create_options()).await {
            Ok(_) => {
                info!(container = %self.spec.name, "created container");
                self.fire(Phase::Post, Event::Create)?;
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(container = %self.spec.name, "container already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Starts the container.
    ///
    /// A `run_once` container that the engine reports as started before is
    /// left alone. For a non-detached spec this blocks until the container
    /// exits; a non-zero exit is fatal.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, [`ContainerError::Exit`] for a non-zero
    /// blocking run, and hook errors.
    pub async fn start(&self) -> Result<()> {
        if self.spec.run_once {
            let info = self.engine.inspect(&self.spec.name).await?;
            if info.started_at.is_some() {
                debug!(
                    container = %self.spec.name,
                    "container is configured to run only once and has been started before"
                );
                return Ok(());
            }
        }

        self.fire(Phase::Pre, Event::Start)?;
        debug!(container = %self.spec.name, "attempting to start container");
        self.engine
            .start(&self.spec.name, self.start_options())
            .await?;
        if self.spec.detach {
            info!(container = %self.spec.name, "started container");
        } else {
            info!(container = %self.spec.name, "waiting for container to finish");
            self.wait(None, false).await?;
            info!(container = %self.spec.name, "container exited ok");
        }
        self.fire(Phase::Post, Event::Start)?;
        Ok(())
    }

    /// Blocks until the container exits and returns its exit code.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WaitTimeout`] (as an engine error) when a
    /// timeout is given and elapses, and [`ContainerError::Exit`] on a
    /// non-zero code unless `accept_any_exit` is set.
    ///
    /// [`EngineError::WaitTimeout`]: crate::engine::EngineError::WaitTimeout
    pub async fn wait(&self, timeout: Option<Duration>, accept_any_exit: bool) -> Result<i64> {
        let code = self.engine.wait(&self.spec.name, timeout).await?;
        if accept_any_exit || code == 0 {
            return Ok(code);
        }
        let logs = self
            .logs()
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        let inspect = self.inspect().await?;
        Err(ContainerError::Exit {
            name: self.spec.name.clone(),
            code,
            logs,
            inspect,
        })
    }

    /// Stops the container, escalating from graceful to forceful
    /// termination.
    ///
    /// Sends TERM and waits up to [`STOP_WAIT`]; on timeout sends KILL and
    /// waits again. If the second wait also times out the container is
    /// abandoned: the failure is logged and `stop` returns normally. A
    /// container the engine does not know, or that is not running, is
    /// treated as already stopped.
    ///
    /// # Errors
    ///
    /// Engine failures other than not-found and wait timeouts, and hook
    /// errors.
    pub async fn stop(&self) -> Result<()> {
        debug!(container = %self.spec.name, "attempting to stop container");
        let info = match self.engine.inspect(&self.spec.name).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                debug!(container = %self.spec.name, "container does not exist");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        if !info.running {
            debug!(container = %self.spec.name, "container is not running");
            return Ok(());
        }

        self.fire(Phase::Pre, Event::Stop)?;
        if self.signal_tolerant(Signal::Term).await? {
            return Ok(());
        }
        match self.engine.wait(&self.spec.name, Some(STOP_WAIT)).await {
            Ok(_) => {
                info!(container = %self.spec.name, "stopped container");
                self.fire(Phase::Post, Event::Stop)
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) if e.is_timeout() => self.stop_forceful().await,
            Err(e) => Err(e.into()),
        }
    }

    async fn stop_forceful(&self) -> Result<()> {
        if self.signal_tolerant(Signal::Kill).await? {
            return Ok(());
        }
        match self.engine.wait(&self.spec.name, Some(STOP_WAIT)).await {
            Ok(_) => {
                info!(container = %self.spec.name, "killed container");
                self.fire(Phase::Post, Event::Stop)
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) if e.is_timeout() => {
                // Abandoned, not retried; removal later tolerates whatever
                // state the container ends up in.
                error!(container = %self.spec.name, "unable to kill container: {e}");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Sends a signal, treating not-found as "already stopped".
    /// Returns `true` when the container was already gone.
    async fn signal_tolerant(&self, signal: Signal) -> Result<bool> {
        match self.engine.signal(&self.spec.name, signal).await {
            Ok(()) => Ok(false),
            Err(e) if e.is_not_found() => {
                debug!(container = %self.spec.name, "container already gone");
                Ok(true)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the container.
    ///
    /// Idempotent: a not-found outcome is success.
    ///
    /// # Errors
    ///
    /// Any other engine failure is fatal; hook errors propagate.
    pub async fn remove(&self) -> Result<()> {
        self.fire(Phase::Pre, Event::Remove)?;
        debug!(container = %self.spec.name, "attempting to remove container");
        match self.engine.remove(&self.spec.name, true).await {
            Ok(()) => {
                info!(container = %self.spec.name, "removed container");
                self.fire(Phase::Post, Event::Remove)?;
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(container = %self.spec.name, "container does not exist");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Captured container output, or `None` when the container is gone.
    ///
    /// # Errors
    ///
    /// Engine failures other than not-found.
    pub async fn logs(&self) -> Result<Option<Vec<u8>>> {
        match self.engine.logs(&self.spec.name).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// State snapshot, or `None` when the container is gone.
    ///
    /// # Errors
    ///
    /// Engine failures other than not-found.
    pub async fn inspect(&self) -> Result<Option<ContainerInspect>> {
        match self.engine.inspect(&self.spec.name).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_options(&self) -> CreateOptions {
        CreateOptions {
            name: self.spec.name.clone(),
            image: self.spec.image.clone(),
            entrypoint: self.spec.entrypoint.clone(),
            working_dir: self.spec.working_dir.clone(),
            command: self.spec.command.clone(),
            env: self.spec.env.iter().map(ToString::to_string).collect(),
            volumes: self
                .spec
                .volumes
                .iter()
                .map(|v| v.container_path.clone())
                .collect(),
        }
    }

    fn start_options(&self) -> StartOptions {
        StartOptions {
            cap_add: self.spec.cap_add.clone(),
            cap_drop: self.spec.cap_drop.clone(),
            binds: self
                .spec
                .volumes
                .iter()
                .filter(|v| v.host_path.is_some())
                .cloned()
                .collect(),
            links: self.spec.links.clone(),
            volumes_from: self.spec.volumes_from.clone(),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.spec.name)
            .field("image", &self.spec.image)
            .finish_non_exhaustive()
    }
}
