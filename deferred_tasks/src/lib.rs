//! A small coalescing queue for work that an interrupt handler must not do itself.
//!
//! Interrupt handlers should only acknowledge the device and record *what*
//! needs doing; the actual work (link renegotiation, slow register pokes)
//! runs later from task context. This crate provides the hand-off point:
//! the handler enqueues a cause, and a deferred task drains causes one at
//! a time. Enqueueing a cause that is already queued is a no-op, so a
//! storm of identical interrupts produces a single unit of deferred work.

#![no_std]

extern crate alloc;

use alloc::collections::VecDeque;
use spin::Mutex;

/// A queue of pending deferred-work causes, deduplicated on insert.
///
/// Shared between interrupt context (producer) and task context (consumer);
/// the internal lock is held only for queue manipulation, never across the
/// deferred work itself.
pub struct DeferredQueue<T: PartialEq> {
    causes: Mutex<VecDeque<T>>,
}

impl<T: PartialEq> DeferredQueue<T> {
    pub const fn new() -> DeferredQueue<T> {
        DeferredQueue {
            causes: Mutex::new(VecDeque::new()),
        }
    }

    /// Record that `cause` needs deferred handling.
    ///
    /// Returns `true` if the cause was newly queued, `false` if an equal
    /// cause was already pending and this call coalesced into it.
    pub fn enqueue(&self, cause: T) -> bool {
        let mut causes = self.causes.lock();
        if causes.iter().any(|c| *c == cause) {
            return false;
        }
        causes.push_back(cause);
        true
    }

    /// Take the oldest pending cause, if any.
    pub fn take(&self) -> Option<T> {
        self.causes.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.causes.lock().is_empty()
    }

    /// Discard everything still queued, e.g. when the device is stopping.
    pub fn clear(&self) {
        self.causes.lock().clear();
    }
}

impl<T: PartialEq> Default for DeferredQueue<T> {
    fn default() -> Self {
        DeferredQueue::new()
    }
}
