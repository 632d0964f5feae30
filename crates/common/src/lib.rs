//! Shared types for the commit event runner.
//!
//! This crate provides:
//! - `Status<T>` for aggregating handler outcomes into one result
//! - `Severity` / `StatusMessage` for ordered, structured messages
//! - `BoxError` for opaque failures crossing the handler/commit seams

pub mod status;

pub use status::{Severity, Status, StatusMessage};

/// Opaque failure type used at the handler and commit boundaries.
///
/// Handlers and unit-of-work implementations report domain-specific failures;
/// the runner only needs to display and optionally convert them, so they
/// travel as boxed errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
