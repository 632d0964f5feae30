//! Unit-of-work seams supplied by the persistence collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use common::BoxError;
use events::TrackedEntity;

/// A persistence unit of work driven by the blocking entry point.
///
/// `tracked_entities` must reflect the change-tracking session at call time;
/// the runner calls it once per cascade pass and never caches the result.
/// `commit` performs the durable write and returns an opaque output (for
/// example a row count) that the runner attaches to the final status.
pub trait UnitOfWork: Send {
    type Output: Send;

    /// The entities currently tracked by this unit of work.
    fn tracked_entities(&self) -> Vec<Arc<dyn TrackedEntity>>;

    /// Performs the durable write.
    fn commit(&mut self) -> std::result::Result<Self::Output, BoxError>;
}

/// A persistence unit of work driven by the async entry point.
#[async_trait]
pub trait AsyncUnitOfWork: Send {
    type Output: Send;

    /// The entities currently tracked by this unit of work.
    fn tracked_entities(&self) -> Vec<Arc<dyn TrackedEntity>>;

    /// Performs the durable write, suspending while it is in flight.
    async fn commit(&mut self) -> std::result::Result<Self::Output, BoxError>;
}
