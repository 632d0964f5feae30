//! Tracked entities and the entity/event pair fed to handlers.

use std::sync::Arc;

use crate::event::DomainEvent;
use crate::queue::EventQueues;

/// A persistence-tracked object capable of queueing domain events.
///
/// The runner only reads the queues and passes the entity through to handlers
/// for context; it never mutates the entity itself.
pub trait TrackedEntity: Send + Sync {
    /// Name of the entity for logs and cascade-overflow diagnostics.
    fn entity_name(&self) -> &str;

    /// The entity's event queues.
    fn events(&self) -> &EventQueues;
}

/// One drained event together with the entity that queued it.
///
/// The entity reference exists to give handlers context; ownership of the
/// event moves here because each event is consumed exactly once.
pub struct EntityEventPair {
    pub entity: Arc<dyn TrackedEntity>,
    pub event: Box<dyn DomainEvent>,
}

impl EntityEventPair {
    pub fn new(entity: Arc<dyn TrackedEntity>, event: Box<dyn DomainEvent>) -> Self {
        Self { entity, event }
    }
}

impl std::fmt::Debug for EntityEventPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityEventPair")
            .field("entity", &self.entity.entity_name())
            .field("event", &self.event.event_name())
            .finish()
    }
}
