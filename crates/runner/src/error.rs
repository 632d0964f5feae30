//! Runner error types.

use common::BoxError;
use thiserror::Error;

/// Fatal faults from a commit cycle.
///
/// Everything recoverable is folded into the returned `Status`; these
/// variants are the conditions that must reach the caller unchanged.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The before-commit cascade exceeded its pass limit, meaning handlers
    /// are producing events without bound. Carries the last processed entity
    /// and event for diagnosis.
    #[error(
        "before-commit cascade exceeded {limit} passes; last event '{event}' on entity '{entity}' \
         suggests handlers are queueing events in a cycle"
    )]
    CascadeOverflow {
        limit: usize,
        entity: String,
        event: String,
    },

    /// A before-commit handler failed and fault conversion is disabled.
    #[error("event handler '{handler}' failed")]
    HandlerFault {
        handler: String,
        #[source]
        source: BoxError,
    },

    /// The commit callback failed and no translator accepted the failure.
    #[error("commit failed")]
    Commit(#[source] BoxError),

    /// A handler declared asynchronous was reached from the blocking entry
    /// point. This is a programming error in the host's registration.
    #[error("async handler '{handler}' cannot run from the blocking entry point")]
    AsyncHandlerInBlockingRun { handler: String },
}

/// Convenience alias for runner results.
pub type Result<T> = std::result::Result<T, RunnerError>;
