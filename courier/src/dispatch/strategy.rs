//! Error-handling strategies for notification dispatch.

/// What to do with a failed handler attempt during a dispatch.
///
/// Under either strategy, every handler across all phases is attempted
/// exactly once - a failure never prevents later handlers from running. The
/// strategy only decides what the publisher observes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchStrategy {
    /// Log the error and move on; the dispatch always completes
    /// successfully, no matter how many handlers failed.
    ContinueOnError,

    /// Accumulate every error (factory or handler) in attempt order; after
    /// all phases finished, fail with an
    /// [`AggregateError`](crate::error::AggregateError) if any attempt
    /// failed.
    CollectErrors,
}
