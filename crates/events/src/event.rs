//! The domain event trait.

use std::any::{Any, TypeId};

/// A domain event: an opaque payload marking that something happened.
///
/// Events are immutable once created, identified by their runtime type, and
/// consumed exactly once by handler invocation. Handlers for an event are
/// resolved by the `TypeId` of the concrete payload, so `as_any` must return
/// the concrete value (`self`), never a wrapper.
pub trait DomainEvent: Send + Sync + std::fmt::Debug + 'static {
    /// Short name of the event, used in logs and diagnostics.
    fn event_name(&self) -> &'static str;

    /// The concrete payload, for runtime-typed handler resolution.
    fn as_any(&self) -> &dyn Any;
}

impl dyn DomainEvent {
    /// Runtime type of the concrete event payload.
    pub fn runtime_type(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// Downcasts to a concrete event type.
    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }
}
