use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use arbiter_core::EmergencyStopState;

/// Process-wide kill switch.
///
/// The flag is an atomic so the evaluation path can read it without taking
/// any lock; the metadata of the last transition sits behind its own lock.
#[derive(Debug, Default)]
pub struct EmergencyStopController {
    active: AtomicBool,
    state: RwLock<Option<EmergencyStopState>>,
}

impl EmergencyStopController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Raise the flag. Re-activating while active replaces the metadata.
    pub fn activate(&self, reason: &str, initiated_by: &str, at: DateTime<Utc>) -> EmergencyStopState {
        let state = EmergencyStopState {
            active: true,
            reason: reason.to_string(),
            initiated_by: initiated_by.to_string(),
            activated_at: at,
            resumed_by: None,
            resumed_at: None,
        };
        let mut guard = self.state.write();
        *guard = Some(state.clone());
        self.active.store(true, Ordering::SeqCst);
        state
    }

    /// Lower the flag. Returns `None` when it was not raised.
    pub fn clear(&self, resumed_by: &str, at: DateTime<Utc>) -> Option<EmergencyStopState> {
        let mut guard = self.state.write();
        if !self.active.load(Ordering::SeqCst) {
            return None;
        }
        let mut state = guard.clone()?;
        state.active = false;
        state.resumed_by = Some(resumed_by.to_string());
        state.resumed_at = Some(at);
        *guard = Some(state.clone());
        self.active.store(false, Ordering::SeqCst);
        Some(state)
    }

    /// Reinstate a persisted state (e.g. on startup).
    pub fn restore(&self, state: EmergencyStopState) {
        let mut guard = self.state.write();
        self.active.store(state.active, Ordering::SeqCst);
        *guard = Some(state);
    }

    /// Metadata of the last transition, if any.
    pub fn state(&self) -> Option<EmergencyStopState> {
        self.state.read().clone()
    }
}
