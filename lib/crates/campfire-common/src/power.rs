//! Authoritative power state machine shared by the idle monitor and the
//! activation gateway.
//!
//! Every change goes through [`PowerStateMachine::transition`], a
//! compare-and-set: the caller names the state it believes is current and the
//! state it wants. If another actor moved the machine first the call fails
//! with [`TransitionError::Conflict`] and nothing changes.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::types::PowerState;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("transition {from} -> {to} is not allowed")]
    NotAllowed { from: PowerState, to: PowerState },

    #[error("expected state {expected} but instance is {actual}")]
    Conflict {
        expected: PowerState,
        actual: PowerState,
    },
}

/// Point-in-time view of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerSnapshot {
    pub state: PowerState,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct PowerStateMachine {
    inner: Mutex<PowerSnapshot>,
}

impl PowerStateMachine {
    #[must_use]
    pub fn new(initial: PowerState) -> Self {
        Self {
            inner: Mutex::new(PowerSnapshot {
                state: initial,
                changed_at: Utc::now(),
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> PowerState {
        self.lock().state
    }

    #[must_use]
    pub fn snapshot(&self) -> PowerSnapshot {
        *self.lock()
    }

    /// Move from `expected` to `next` if and only if the machine is currently
    /// in `expected` and the edge exists.
    pub fn transition(
        &self,
        expected: PowerState,
        next: PowerState,
    ) -> Result<PowerSnapshot, TransitionError> {
        if !expected.can_transition_to(next) {
            return Err(TransitionError::NotAllowed {
                from: expected,
                to: next,
            });
        }
        let mut guard = self.lock();
        if guard.state != expected {
            return Err(TransitionError::Conflict {
                expected,
                actual: guard.state,
            });
        }
        *guard = PowerSnapshot {
            state: next,
            changed_at: Utc::now(),
        };
        tracing::debug!(from = %expected, to = %next, "power state transition");
        Ok(*guard)
    }

    /// Boot finished: `Starting -> Running`. Already running is fine.
    pub fn boot_complete(&self) -> Result<PowerSnapshot, TransitionError> {
        match self.transition(PowerState::Starting, PowerState::Running) {
            Err(TransitionError::Conflict {
                actual: PowerState::Running | PowerState::IdlePendingShutdown,
                ..
            }) => Ok(self.snapshot()),
            other => other,
        }
    }

    /// Align the machine with the state reported by the platform.
    ///
    /// Instance state alone cannot show a pending idle shutdown, so a bare
    /// `Running` observation leaves `IdlePendingShutdown` untouched. Callers
    /// that read the published flag pass `IdlePendingShutdown` themselves.
    pub fn observe(&self, observed: PowerState) -> PowerState {
        let mut guard = self.lock();
        let keep_pending = guard.state == PowerState::IdlePendingShutdown
            && observed == PowerState::Running;
        if !keep_pending && guard.state != observed {
            tracing::debug!(from = %guard.state, to = %observed, "power state synced from platform");
            *guard = PowerSnapshot {
                state: observed,
                changed_at: Utc::now(),
            };
        }
        guard.state
    }

    fn lock(&self) -> MutexGuard<'_, PowerSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
