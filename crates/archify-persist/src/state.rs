//! Adapter lifecycle state machine
//!
//! ```text
//! Idle ──► Restoring ──► Ready ◄──► PendingWrite ⟲
//!  │  ◄────────┘          ▲
//!  └──────────────────────┘ (autosave started without a restore)
//! ```

use crate::error::StateError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the adapter is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterState {
    /// Nothing restored yet, or the stored document was discarded
    Idle,
    /// Reading and sanitizing the autosave slot
    Restoring,
    /// Session loaded; no write scheduled
    Ready,
    /// A debounced write is scheduled or running
    PendingWrite,
}

impl AdapterState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AdapterState::Idle => "idle",
            AdapterState::Restoring => "restoring",
            AdapterState::Ready => "ready",
            AdapterState::PendingWrite => "pending_write",
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a state transition
///
/// # Errors
/// `StateError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: AdapterState, to: AdapterState) -> Result<(), StateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: AdapterState) -> &'static [AdapterState] {
    use AdapterState::{Idle, PendingWrite, Ready, Restoring};
    match from {
        Idle => &[Restoring, Ready],
        Restoring => &[Ready, Idle],
        Ready => &[PendingWrite],
        PendingWrite => &[PendingWrite, Ready],
    }
}

/// Current state plus the ticket of the latest scheduled write
#[derive(Debug)]
pub(crate) struct StateTracker {
    inner: Mutex<(AdapterState, u64)>,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new((AdapterState::Idle, 0)),
        }
    }

    pub(crate) fn current(&self) -> AdapterState {
        self.inner.lock().0
    }

    pub(crate) fn transition(&self, to: AdapterState) -> Result<(), StateError> {
        let mut guard = self.inner.lock();
        validate_transition(guard.0, to)?;
        tracing::debug!(from = %guard.0, to = %to, "adapter state");
        guard.0 = to;
        Ok(())
    }

    /// Move to `PendingWrite` and hand out a ticket for the scheduled write
    pub(crate) fn arm(&self) -> Result<u64, StateError> {
        let mut guard = self.inner.lock();
        validate_transition(guard.0, AdapterState::PendingWrite)?;
        guard.0 = AdapterState::PendingWrite;
        guard.1 += 1;
        Ok(guard.1)
    }

    /// Back to `Ready` if `ticket` is still the latest scheduled write
    pub(crate) fn settle(&self, ticket: u64) -> bool {
        let mut guard = self.inner.lock();
        if guard.0 == AdapterState::PendingWrite && guard.1 == ticket {
            guard.0 = AdapterState::Ready;
            true
        } else {
            false
        }
    }

    /// Back to `Ready` after the pending write was cancelled
    ///
    /// Outstanding tickets are invalidated.
    pub(crate) fn disarm(&self) -> bool {
        let mut guard = self.inner.lock();
        if guard.0 != AdapterState::PendingWrite {
            return false;
        }
        guard.0 = AdapterState::Ready;
        guard.1 += 1;
        true
    }
}
