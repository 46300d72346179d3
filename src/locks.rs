//! Per-owner keyed mutex.
//!
//! Serializes every read -> compute -> write sequence for one owner while
//! letting different owners proceed in parallel. Entries are dropped once no
//! caller holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TrackerError};
use crate::task::OwnerId;

#[derive(Debug, Default)]
pub struct OwnerLocks {
    slots: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl OwnerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the owner's lock.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Lock`] if the slot table is poisoned, otherwise
    /// whatever `f` returns.
    pub fn with<T>(&self, owner: &OwnerId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let slot = {
            let mut slots = self.slots_guard()?;
            Arc::clone(slots.entry(owner.clone()).or_default())
        };

        let result = {
            // A panic inside another holder leaves `()` intact; keep serving.
            let _guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        let mut slots = self.slots_guard()?;
        // One count for the table, one for `slot`.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(owner);
        }
        result
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn slots_guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<OwnerId, Arc<Mutex<()>>>>> {
        self.slots
            .lock()
            .map_err(|e| TrackerError::Lock(e.to_string()))
    }
}
