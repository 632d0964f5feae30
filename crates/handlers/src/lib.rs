//! Handler traits and the registry that resolves them by event runtime type.
//!
//! Handlers are registered once at startup against a concrete event type and
//! a phase (before or after commit). Resolution is a `TypeId` lookup that
//! returns the registrations in registration order; an event type with no
//! handlers resolves to an empty slice and is simply skipped by the runner.

pub mod handler;
pub mod registry;

pub use handler::{AsyncEventHandler, EventHandler, HandlerOptions};
pub use registry::{HandlerRegistration, HandlerRegistry, Phase};
