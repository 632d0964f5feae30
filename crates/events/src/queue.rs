//! Per-entity event queues with atomic drain-and-clear.

use std::sync::Mutex;

use crate::event::DomainEvent;

/// The two ordered event queues owned by a tracked entity.
///
/// Events queued before commit may block the commit; events queued for after
/// commit run only once the durable write has succeeded. Draining clears the
/// queue under the same lock acquisition, so an event delivered by one drain
/// can never reappear in a later drain. Enqueuing is unrestricted, including
/// from inside a handler mid-cascade; newly appended events are picked up by
/// the next cascade pass.
#[derive(Debug, Default)]
pub struct EventQueues {
    before: Mutex<Vec<Box<dyn DomainEvent>>>,
    after: Mutex<Vec<Box<dyn DomainEvent>>>,
}

impl EventQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event to run before the commit.
    pub fn enqueue_before<E: DomainEvent>(&self, event: E) {
        tracing::trace!(event = event.event_name(), "queued before-commit event");
        self.lock_before().push(Box::new(event));
    }

    /// Queues an event to run after a successful commit.
    pub fn enqueue_after<E: DomainEvent>(&self, event: E) {
        tracing::trace!(event = event.event_name(), "queued after-commit event");
        self.lock_after().push(Box::new(event));
    }

    /// Removes and returns all queued before-commit events, in order.
    pub fn drain_before(&self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut *self.lock_before())
    }

    /// Removes and returns all queued after-commit events, in order.
    pub fn drain_after(&self) -> Vec<Box<dyn DomainEvent>> {
        std::mem::take(&mut *self.lock_after())
    }

    /// Number of before-commit events currently queued.
    pub fn pending_before(&self) -> usize {
        self.lock_before().len()
    }

    /// Number of after-commit events currently queued.
    pub fn pending_after(&self) -> usize {
        self.lock_after().len()
    }

    fn lock_before(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn DomainEvent>>> {
        self.before.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_after(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn DomainEvent>>> {
        self.after.lock().unwrap_or_else(|e| e.into_inner())
    }
}
