//! Lifecycle hooks.
//!
//! Hooks are typed callbacks fired synchronously around container state
//! transitions. The registry maps a `(Phase, Event)` pair to handlers
//! resolved by the host application at configuration-load time; nothing is
//! resolved dynamically from text at dispatch time.

use crate::error::{ContainerError, Result};
use crate::spec::ContainerSpec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Hook phase relative to the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Before the transition.
    Pre,
    /// After the transition.
    Post,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pre => write!(f, "pre"),
            Self::Post => write!(f, "post"),
        }
    }
}

/// Lifecycle event a hook attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    /// The create+start sequence.
    Init,
    /// Container creation.
    Create,
    /// Container start.
    Start,
    /// Container stop.
    Stop,
    /// Container removal.
    Remove,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Create => write!(f, "create"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Error for an unrecognized phase or event token.
#[derive(Debug, Error)]
#[error("invalid hook {kind} '{value}'")]
pub struct HookSpecError {
    kind: &'static str,
    value: String,
}

impl FromStr for Phase {
    type Err = HookSpecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pre" => Ok(Self::Pre),
            "post" => Ok(Self::Post),
            _ => Err(HookSpecError {
                kind: "phase",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for Event {
    type Err = HookSpecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "init" => Ok(Self::Init),
            "create" => Ok(Self::Create),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "remove" => Ok(Self::Remove),
            _ => Err(HookSpecError {
                kind: "event",
                value: s.to_string(),
            }),
        }
    }
}

/// Error type hooks may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// A hook handler.
pub type HookFn = Arc<dyn Fn(&ContainerSpec) -> std::result::Result<(), HookError> + Send + Sync>;

struct HookEntry {
    phase: Phase,
    event: Event,
    hook: HookFn,
}

/// Registry of lifecycle hooks for one container.
///
/// Handlers matching a `(phase, event)` pair fire in registration order. A
/// handler error aborts the surrounding transition; it is not swallowed.
#[derive(Clone, Default)]
pub struct HookRegistry {
    entries: Vec<Arc<HookEntry>>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a `(phase, event)` pair.
    pub fn register<F>(&mut self, phase: Phase, event: Event, hook: F)
    where
        F: Fn(&ContainerSpec) -> std::result::Result<(), HookError> + Send + Sync + 'static,
    {
        self.entries.push(Arc::new(HookEntry {
            phase,
            event,
            hook: Arc::new(hook),
        }));
    }

    /// Fires all handlers matching `(phase, event)`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Hook`] with the failing handler's error as
    /// source; remaining handlers do not run.
    pub fn fire(&self, phase: Phase, event: Event, spec: &ContainerSpec) -> Result<()> {
        for entry in &self.entries {
            if entry.phase == phase && entry.event == event {
                (entry.hook)(spec).map_err(|source| ContainerError::Hook {
                    name: spec.name.clone(),
                    phase,
                    event,
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Returns whether the registry holds no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn phase_and_event_tokens_are_fixed() {
        assert_eq!("pre".parse::<Phase>().unwrap(), Phase::Pre);
        assert_eq!("stop".parse::<Event>().unwrap(), Event::Stop);
        assert!("during".parse::<Phase>().is_err());
        assert!("restart".parse::<Event>().is_err());
    }

    #[test]
    fn hooks_fire_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register(Phase::Pre, Event::Create, move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            });
        }
        // A non-matching pair must not fire.
        registry.register(Phase::Post, Event::Create, |_| {
            panic!("post hook fired for pre dispatch")
        });

        let spec = ContainerSpec::new("base");
        registry.fire(Phase::Pre, Event::Create, &spec).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn hook_error_stops_dispatch() {
        let mut registry = HookRegistry::new();
        registry.register(Phase::Pre, Event::Start, |_| Err("boom".into()));
        registry.register(Phase::Pre, Event::Start, |_| {
            panic!("handler after a failing hook must not run")
        });

        let spec = ContainerSpec::new("base");
        let err = registry.fire(Phase::Pre, Event::Start, &spec).unwrap_err();
        assert!(matches!(err, ContainerError::Hook { .. }));
    }
}
