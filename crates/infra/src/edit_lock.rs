//! Per-order in-flight guard.
//!
//! While a transition waits on the repository, the order's editing surface is
//! locked: a second transition on the same order is refused rather than
//! queued.

use std::collections::HashSet;
use std::sync::Mutex;

use medcamp_core::OrderId;

#[derive(Debug, Default)]
pub struct EditLocks {
    in_flight: Mutex<HashSet<OrderId>>,
}

impl EditLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `order_id` as in flight. `None` if it already is.
    pub fn try_acquire(&self, order_id: OrderId) -> Option<EditGuard<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(order_id) {
            return None;
        }
        Some(EditGuard { locks: self, order_id })
    }

    pub fn is_locked(&self, order_id: &OrderId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(order_id)
    }
}

/// Releases the order when dropped, whatever the transition's outcome.
#[derive(Debug)]
pub struct EditGuard<'a> {
    locks: &'a EditLocks,
    order_id: OrderId,
}

impl EditGuard<'_> {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.locks.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.order_id);
    }
}
