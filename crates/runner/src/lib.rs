//! Domain-event orchestration around a transactional commit.
//!
//! Entities queue before-commit and after-commit events; on commit the
//! runner:
//! 1. Cascades over before-commit events, invoking registered handlers and
//!    aggregating their outcomes into one `Status`
//! 2. Invokes the unit-of-work commit only while that status is valid,
//!    translating commit faults through per-collaborator policies
//! 3. Dispatches after-commit events, whose failures can only add warnings
//!
//! Events live in memory for the duration of one commit cycle; this is not a
//! message bus and nothing here is durable.

pub mod config;
pub mod error;
mod invoker;
pub mod runner;
mod translator;
pub mod uow;

pub use common::{BoxError, Severity, Status, StatusMessage};
pub use events::{DomainEvent, EntityEventPair, EventQueues, TrackedEntity};
pub use handlers::{
    AsyncEventHandler, EventHandler, HandlerOptions, HandlerRegistration, HandlerRegistry, Phase,
};

pub use config::RunnerConfig;
pub use error::{Result, RunnerError};
pub use runner::{COMMIT_SUCCESS_MESSAGE, EventRunner};
pub use uow::{AsyncUnitOfWork, UnitOfWork};
