//! Load-once model slot with an observable readiness state.
//!
//! ```text
//! NotLoaded ──begin_loading──▶ Loading ──publish──▶ Ready
//!                                 │
//!                                 └──────fail─────▶ Failed
//! ```
//!
//! `Ready` and `Failed` are terminal. The context is stored before the state
//! flips to `Ready` (release), and readers check the state first (acquire),
//! so nobody ever observes a half-built context.

use crate::error::{DpeError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Readiness of a [`ModelSlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ModelState {
    /// Nothing attempted yet
    NotLoaded = 0,
    /// Artifacts are being read
    Loading = 1,
    /// Serving
    Ready = 2,
    /// Loading failed; the process will never become ready
    Failed = 3,
}

impl ModelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::NotLoaded,
        }
    }

    /// Snake-case name, as reported by health checks.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotLoaded => "not_loaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Holds one immutable context, published once.
///
/// # Examples
///
/// ```
/// use dpe_predict::serving::{ModelSlot, ModelState};
///
/// let slot: ModelSlot<String> = ModelSlot::new("demo");
/// assert!(slot.get().is_err());
///
/// assert!(slot.begin_loading());
/// slot.publish("context".to_string()).expect("slot is loading");
/// assert_eq!(slot.state(), ModelState::Ready);
/// assert_eq!(slot.get().expect("ready").as_str(), "context");
/// ```
#[derive(Debug)]
pub struct ModelSlot<T> {
    name: &'static str,
    state: AtomicU8,
    value: OnceLock<Arc<T>>,
    failure: OnceLock<String>,
}

impl<T> ModelSlot<T> {
    /// Creates an empty slot. `name` only appears in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(ModelState::NotLoaded as u8),
            value: OnceLock::new(),
            failure: OnceLock::new(),
        }
    }

    /// Slot name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ModelState {
        ModelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once a context is published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == ModelState::Ready
    }

    /// Moves `NotLoaded → Loading`. Returns false if loading already started,
    /// so only one loader ever runs.
    pub fn begin_loading(&self) -> bool {
        let started = self.transition(ModelState::NotLoaded, ModelState::Loading);
        if started {
            tracing::info!(slot = self.name, "model loading started");
        }
        started
    }

    /// Stores the context and moves `Loading → Ready`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is not `Loading`.
    pub fn publish(&self, value: T) -> Result<()> {
        let state = self.state();
        if state != ModelState::Loading {
            return Err(DpeError::Other(format!(
                "cannot publish {} model while {state}",
                self.name
            )));
        }
        if self.value.set(Arc::new(value)).is_err() {
            return Err(DpeError::Other(format!("{} model already published", self.name)));
        }
        if !self.transition(ModelState::Loading, ModelState::Ready) {
            return Err(DpeError::Other(format!(
                "{} model changed state during publish",
                self.name
            )));
        }
        tracing::info!(slot = self.name, "model ready");
        Ok(())
    }

    /// Records the failure reason and moves `Loading → Failed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is not `Loading`.
    pub fn fail(&self, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        if !self.transition(ModelState::Loading, ModelState::Failed) {
            return Err(DpeError::Other(format!(
                "cannot fail {} model while {}",
                self.name,
                self.state()
            )));
        }
        tracing::error!(slot = self.name, %reason, "model loading failed");
        let _ = self.failure.set(reason);
        Ok(())
    }

    /// Why loading failed, if it did.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    /// The published context.
    ///
    /// # Errors
    ///
    /// Returns [`DpeError::ServiceUnavailable`] unless the slot is `Ready`.
    /// Never blocks.
    pub fn get(&self) -> Result<Arc<T>> {
        let state = self.state();
        if state != ModelState::Ready {
            return Err(DpeError::ServiceUnavailable {
                state: state.to_string(),
            });
        }
        self.value
            .get()
            .cloned()
            .ok_or_else(|| DpeError::ServiceUnavailable {
                state: state.to_string(),
            })
    }

    /// Runs `load` as the one loader for this slot and records the outcome.
    ///
    /// Returns the final state; a no-op if loading already started.
    pub fn load_with<F>(&self, load: F) -> ModelState
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.begin_loading() {
            return self.state();
        }
        let outcome = match load() {
            Ok(value) => self.publish(value),
            Err(err) => self.fail(err.to_string()),
        };
        if let Err(err) = outcome {
            tracing::warn!(slot = self.name, error = %err, "readiness transition rejected");
        }
        self.state()
    }

    fn transition(&self, from: ModelState, to: ModelState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
