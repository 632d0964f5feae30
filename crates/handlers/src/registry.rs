//! Runtime-typed handler registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{BoxError, Status};
use events::{DomainEvent, TrackedEntity};

use crate::handler::{AsyncEventHandler, EventHandler, HandlerOptions};

/// The phase an event runs in relative to the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeCommit,
    AfterCommit,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::BeforeCommit => write!(f, "before"),
            Phase::AfterCommit => write!(f, "after"),
        }
    }
}

/// Type-erased call seam over a typed handler.
///
/// A blocking handler's async shim runs the sync body directly, so invoking
/// it from the async path completes without suspending.
#[async_trait]
trait ErasedHandler: Send + Sync {
    fn invoke_blocking(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError>;

    async fn invoke(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError>;
}

struct BlockingAdapter<H>(H);

#[async_trait]
impl<H: EventHandler> ErasedHandler for BlockingAdapter<H> {
    fn invoke_blocking(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        let event = downcast::<H::Event>(event)?;
        self.0.handle(entity, event)
    }

    async fn invoke(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        self.invoke_blocking(entity, event)
    }
}

struct AsyncAdapter<H>(H);

#[async_trait]
impl<H: AsyncEventHandler> ErasedHandler for AsyncAdapter<H> {
    fn invoke_blocking(
        &self,
        _entity: &dyn TrackedEntity,
        _event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        // The runner rejects async handlers on the blocking path before
        // reaching this seam.
        Err("async handler requires the async entry point".into())
    }

    async fn invoke(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        let event = downcast::<H::Event>(event)?;
        self.0.handle(entity, event).await
    }
}

fn downcast<E: DomainEvent>(event: &dyn DomainEvent) -> Result<&E, BoxError> {
    event.downcast_ref::<E>().ok_or_else(|| {
        format!("event '{}' does not match the registered type", event.event_name()).into()
    })
}

/// One registered handler: the erased instance plus its declared capability
/// and per-handler configuration, captured at registration time.
#[derive(Clone)]
pub struct HandlerRegistration {
    name: &'static str,
    is_async: bool,
    options: HandlerOptions,
    handler: Arc<dyn ErasedHandler>,
}

impl HandlerRegistration {
    /// Fully qualified type name of the handler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the handler may suspend and therefore needs the async path.
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Per-handler stop-on-first-error override, if declared.
    pub fn stop_on_first_error(&self) -> Option<bool> {
        self.options.stop_on_first_error
    }

    /// Per-handler fault-message override, if declared.
    pub fn fault_message(&self) -> Option<&str> {
        self.options.fault_message.as_deref()
    }

    /// Invokes the handler on the calling thread.
    pub fn invoke_blocking(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        self.handler.invoke_blocking(entity, event)
    }

    /// Invokes the handler, suspending if it is asynchronous.
    pub async fn invoke(
        &self,
        entity: &dyn TrackedEntity,
        event: &dyn DomainEvent,
    ) -> Result<Status, BoxError> {
        self.handler.invoke(entity, event).await
    }
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("name", &self.name)
            .field("is_async", &self.is_async)
            .field("options", &self.options)
            .finish()
    }
}

/// Registry mapping an event's runtime type to its handlers, per phase.
///
/// Built once at startup, then shared read-only across commit cycles.
/// Handlers for the same event type are resolved in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    before: HashMap<TypeId, Vec<HandlerRegistration>>,
    after: HashMap<TypeId, Vec<HandlerRegistration>>,
    fault_messages: HashMap<TypeId, String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a synchronous before-commit handler.
    pub fn register_before<H: EventHandler>(&mut self, handler: H) -> &mut Self {
        self.insert::<H::Event>(
            Phase::BeforeCommit,
            registration::<H, _>(handler.options(), false, BlockingAdapter(handler)),
        );
        self
    }

    /// Registers an asynchronous before-commit handler.
    pub fn register_before_async<H: AsyncEventHandler>(&mut self, handler: H) -> &mut Self {
        self.insert::<H::Event>(
            Phase::BeforeCommit,
            registration::<H, _>(handler.options(), true, AsyncAdapter(handler)),
        );
        self
    }

    /// Registers a synchronous after-commit handler.
    pub fn register_after<H: EventHandler>(&mut self, handler: H) -> &mut Self {
        self.insert::<H::Event>(
            Phase::AfterCommit,
            registration::<H, _>(handler.options(), false, BlockingAdapter(handler)),
        );
        self
    }

    /// Registers an asynchronous after-commit handler.
    pub fn register_after_async<H: AsyncEventHandler>(&mut self, handler: H) -> &mut Self {
        self.insert::<H::Event>(
            Phase::AfterCommit,
            registration::<H, _>(handler.options(), true, AsyncAdapter(handler)),
        );
        self
    }

    /// Sets the fault message used when any handler for `E` fails
    /// unexpectedly. A per-handler message takes precedence.
    pub fn set_fault_message<E: DomainEvent>(&mut self, text: impl Into<String>) -> &mut Self {
        self.fault_messages.insert(TypeId::of::<E>(), text.into());
        self
    }

    /// The fault message registered for an event type, if any.
    pub fn fault_message(&self, event_type: TypeId) -> Option<&str> {
        self.fault_messages.get(&event_type).map(String::as_str)
    }

    /// Resolves the handlers registered for an event's runtime type.
    ///
    /// Returns an empty slice when nothing is registered; the event is then
    /// skipped rather than treated as an error.
    pub fn resolve(&self, event_type: TypeId, phase: Phase) -> &[HandlerRegistration] {
        self.map(phase)
            .get(&event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of handlers registered for a phase.
    pub fn handler_count(&self, phase: Phase) -> usize {
        self.map(phase).values().map(Vec::len).sum()
    }

    fn map(&self, phase: Phase) -> &HashMap<TypeId, Vec<HandlerRegistration>> {
        match phase {
            Phase::BeforeCommit => &self.before,
            Phase::AfterCommit => &self.after,
        }
    }

    fn insert<E: DomainEvent>(&mut self, phase: Phase, registration: HandlerRegistration) {
        let map = match phase {
            Phase::BeforeCommit => &mut self.before,
            Phase::AfterCommit => &mut self.after,
        };
        map.entry(TypeId::of::<E>()).or_default().push(registration);
    }
}

fn registration<H: 'static, E: ErasedHandler + 'static>(
    options: HandlerOptions,
    is_async: bool,
    handler: E,
) -> HandlerRegistration {
    HandlerRegistration {
        name: std::any::type_name::<H>(),
        is_async,
        options,
        handler: Arc::new(handler),
    }
}
