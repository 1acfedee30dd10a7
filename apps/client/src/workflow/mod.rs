//! Controllers driving the analysis workflow: auth, upload, history.
//!
//! Controllers take `&self` and keep their state behind a `std::sync::Mutex` that
//! is never held across an `.await`. That lets independent operations on the same
//! controller (deletes of different ids, say) run concurrently.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod auth;
pub mod history;
pub mod upload;

#[cfg(test)]
pub(crate) mod fake;

/// Result of an operation that may complete after the user has navigated away.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Applied(T),
    /// Completed after `leave()`; nothing was applied and nothing was surfaced.
    Discarded,
}

impl<T> Completion<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Completion::Applied(value) => Some(value),
            Completion::Discarded => None,
        }
    }
}

/// Locks controller state, recovering it if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears an in-flight marker when dropped, including when the owning future is
/// dropped mid-await. Drop it before locking the same state again.
pub(crate) struct InFlight<'a, T, F: FnOnce(&mut T)> {
    state: &'a Mutex<T>,
    clear: Option<F>,
}

pub(crate) fn in_flight<T, F: FnOnce(&mut T)>(state: &Mutex<T>, clear: F) -> InFlight<'_, T, F> {
    InFlight {
        state,
        clear: Some(clear),
    }
}

impl<T, F: FnOnce(&mut T)> Drop for InFlight<'_, T, F> {
    fn drop(&mut self) {
        if let Some(clear) = self.clear.take() {
            clear(&mut lock(self.state));
        }
    }
}
