//! Typed handler traits for before-commit and after-commit events.

use async_trait::async_trait;
use common::{BoxError, Status};
use events::{DomainEvent, TrackedEntity};

/// Per-handler configuration, consulted by the runner instead of the global
/// config when set.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    /// Overrides the runner-wide stop-on-first-error setting for this
    /// handler's invocations.
    pub stop_on_first_error: Option<bool>,

    /// Replaces the generic system-error text when this handler fails
    /// unexpectedly.
    pub fault_message: Option<String>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = Some(stop);
        self
    }

    pub fn fault_message(mut self, text: impl Into<String>) -> Self {
        self.fault_message = Some(text.into());
        self
    }
}

/// A synchronous handler for one concrete event type.
///
/// Returning an invalid `Status` reports a business-rule failure; returning
/// `Err` reports an unexpected fault, which the runner converts or propagates
/// according to its configuration.
pub trait EventHandler: Send + Sync + 'static {
    type Event: DomainEvent;

    /// Per-handler configuration; the default has no overrides.
    fn options(&self) -> HandlerOptions {
        HandlerOptions::default()
    }

    fn handle(&self, entity: &dyn TrackedEntity, event: &Self::Event) -> Result<Status, BoxError>;
}

/// An asynchronous handler for one concrete event type.
///
/// Async handlers may suspend awaiting I/O and can only run through the
/// runner's async entry point.
#[async_trait]
pub trait AsyncEventHandler: Send + Sync + 'static {
    type Event: DomainEvent;

    /// Per-handler configuration; the default has no overrides.
    fn options(&self) -> HandlerOptions {
        HandlerOptions::default()
    }

    async fn handle(
        &self,
        entity: &dyn TrackedEntity,
        event: &Self::Event,
    ) -> Result<Status, BoxError>;
}
