//! Domain events and the per-entity queues that feed the commit runner.
//!
//! This crate provides:
//! - `DomainEvent` trait for opaque, runtime-typed event payloads
//! - `EventQueues` holding an entity's before-commit and after-commit queues
//! - `TrackedEntity` trait for persistence-tracked objects that queue events
//! - `EntityEventPair`, the unit of work handed to handler invocation

pub mod entity;
pub mod event;
pub mod queue;

pub use entity::{EntityEventPair, TrackedEntity};
pub use event::DomainEvent;
pub use queue::EventQueues;
