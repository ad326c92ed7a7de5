//! Single-assignment, multi-consumer service futures.
//!
//! A [`Pending`] is created empty, settled at most once by the service that
//! owns it, and awaited by any number of dependents.  Settling wakes every
//! waiter; waiting on an already-settled slot completes immediately.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ResolveError;
use crate::value::ServiceValue;

/// What a settled service future holds.
pub type Outcome = Result<ServiceValue, ResolveError>;

/// Shared handle to a service's eventual value.
#[derive(Clone)]
pub struct Pending {
    slot: Arc<watch::Sender<Option<Outcome>>>,
}

impl Pending {
    /// Creates an unsettled future.
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Creates a future already settled with `value`.
    pub fn ready(value: ServiceValue) -> Self {
        let (slot, _) = watch::channel(Some(Ok(value)));
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Settles the future.
    ///
    /// Returns `false` and leaves the stored outcome untouched if the future
    /// was already settled.
    pub fn settle(&self, outcome: Outcome) -> bool {
        let mut outcome = Some(outcome);
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = outcome.take();
            true
        })
    }

    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Returns the outcome without waiting, if there is one.
    pub fn peek(&self) -> Option<Outcome> {
        self.slot.borrow().clone()
    }

    /// Waits until the future is settled and returns its outcome.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.slot.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            // `self` owns the sender, so the channel never closes while waiting.
            let _ = rx.changed().await;
        }
    }

    /// Returns `true` if both handles refer to the same future.
    pub fn ptr_eq(&self, other: &Pending) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Default for Pending {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            None => "pending",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}
