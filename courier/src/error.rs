//! Error types for the courier dispatch engine.
//!
//! The taxonomy separates three very different things that can go wrong:
//!
//! - [`ConfigurationError`] - a registration defect (a factory failed). This
//!   is a programmer error, surfaced before any pipeline work runs.
//! - [`ExecutionError`] - an unexpected failure inside a behavior or handler,
//!   wrapped exactly once with the component, request type, and correlation
//!   id where it crossed a chain boundary.
//! - [`ShortCircuit`] - not an error at all, but an intentional control-flow
//!   signal carrying a typed payload to the original caller. It is never
//!   wrapped by any chain layer.
//!
//! [`AggregateError`] belongs to the notification side: it collects every
//! failed handler attempt from one dispatch, in attempt order.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::id::CorrelationId;

/// Boxed application error used at the capability boundaries.
///
/// Handlers and behaviors report their own failures as `BoxError`; the chain
/// runner classifies and wraps them into [`ExecutionError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A registration failed to produce a usable component.
///
/// Raised when a behavior or notification-handler factory returns an error.
/// Always synchronous, never retried.
#[derive(Debug, Error)]
#[error("registration '{description}' failed to instantiate: {source}")]
pub struct ConfigurationError {
    /// Human-readable description of the offending registration.
    pub description: String,

    /// The error returned by the factory.
    #[source]
    pub source: BoxError,
}

impl ConfigurationError {
    /// Create a configuration error for the named registration.
    pub fn new(description: impl Into<String>, source: BoxError) -> Self {
        Self {
            description: description.into(),
            source,
        }
    }
}

/// An unexpected failure from a behavior or handler, attributed to the chain
/// layer where it happened.
///
/// Chain layers never nest one `ExecutionError` inside another: an error that
/// is already wrapped passes through every enclosing layer unchanged.
#[derive(Debug, Error)]
#[error("{component} failed handling {request_type} (correlation {correlation_id}): {source}")]
pub struct ExecutionError {
    /// Type name of the behavior or handler that failed.
    pub component: &'static str,

    /// Type name of the request being processed.
    pub request_type: &'static str,

    /// Correlation id of the invocation.
    pub correlation_id: CorrelationId,

    /// The underlying failure.
    #[source]
    pub source: BoxError,
}

impl ExecutionError {
    /// Wrap a raw failure, attributing it to `component`.
    pub fn new(
        component: &'static str,
        request_type: &'static str,
        correlation_id: CorrelationId,
        source: BoxError,
    ) -> Self {
        Self {
            component,
            request_type,
            correlation_id,
            source,
        }
    }
}

/// Intentional early termination of a pipeline, carrying a typed payload.
///
/// A behavior raises this to halt the chain and hand a specific value to the
/// original caller. Every enclosing layer passes it through untouched, so the
/// caller can [`downcast`](ShortCircuit::downcast) the payload back to the
/// concrete type the behavior put in.
///
/// This is distinct from the other legal way to stop a chain: a behavior may
/// simply return a response without invoking `next`, in which case no error
/// is involved at all.
pub struct ShortCircuit {
    payload: Box<dyn Any + Send + Sync>,
    description: String,
}

impl ShortCircuit {
    /// Create a short-circuit signal with the given payload.
    pub fn new<T: Send + Sync + 'static>(payload: T, description: impl Into<String>) -> Self {
        Self {
            payload: Box::new(payload),
            description: description.into(),
        }
    }

    /// Description supplied by the behavior that short-circuited.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Take the payload out, if it has type `T`.
    ///
    /// Returns `Err(self)` unchanged when the payload is some other type.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        match self.payload.downcast::<T>() {
            Ok(payload) => Ok(*payload),
            Err(payload) => Err(Self {
                payload,
                description: self.description,
            }),
        }
    }

    /// Borrow the payload, if it has type `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortCircuit")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ShortCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline short-circuited: {}", self.description)
    }
}

impl std::error::Error for ShortCircuit {}

/// Outcome classification flowing through a behavior chain.
///
/// Behaviors return this from `handle`; the chain runner classifies each
/// layer's result as it crosses the layer boundary:
///
/// - `ShortCircuit` and `Execution` pass through unchanged,
/// - `Failure` (a behavior's own raw error) and `Configuration` are wrapped
///   into `Execution` naming the layer that produced them.
///
/// `Failure` therefore never escapes the chain; callers observe only
/// `ShortCircuit` or `Execution` (and `Configuration` from instantiation,
/// before any chain runs).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Intentional early termination; reaches the caller unwrapped.
    #[error(transparent)]
    ShortCircuit(#[from] ShortCircuit),

    /// A failure already attributed to the layer where it happened.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A registration defect detected while building the pipeline.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A behavior's own raw failure, not yet attributed to a layer.
    #[error("{0}")]
    Failure(#[source] BoxError),
}

impl PipelineError {
    /// Wrap a raw application error for propagation out of a behavior.
    pub fn failure(err: impl Into<BoxError>) -> Self {
        PipelineError::Failure(err.into())
    }

    /// Short-circuit the pipeline with a typed payload.
    pub fn short_circuit<T: Send + Sync + 'static>(
        payload: T,
        description: impl Into<String>,
    ) -> Self {
        PipelineError::ShortCircuit(ShortCircuit::new(payload, description))
    }
}

impl From<BoxError> for PipelineError {
    fn from(err: BoxError) -> Self {
        PipelineError::Failure(err)
    }
}

/// Every failed handler attempt from one notification dispatch.
///
/// Produced only under [`DispatchStrategy::CollectErrors`]; errors appear in
/// attempt order (first failure first), and every handler across all phases
/// was still attempted exactly once.
///
/// [`DispatchStrategy::CollectErrors`]: crate::dispatch::DispatchStrategy::CollectErrors
#[derive(Debug, Error)]
#[error("notification dispatch failed: {count} handler attempt(s) errored", count = .errors.len())]
pub struct AggregateError {
    /// The collected failures, in attempt order.
    pub errors: Vec<BoxError>,
}

impl AggregateError {
    /// Number of failed attempts.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no attempt failed (never constructed by the dispatcher).
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_circuit_downcast_roundtrip() {
        let sc = ShortCircuit::new(42u32, "cached");
        assert_eq!(sc.downcast_ref::<u32>(), Some(&42));
        assert_eq!(sc.downcast::<u32>().unwrap(), 42);
    }

    #[test]
    fn test_short_circuit_downcast_wrong_type() {
        let sc = ShortCircuit::new("payload".to_string(), "cached");
        let sc = sc.downcast::<u32>().unwrap_err();
        assert_eq!(sc.description(), "cached");
        assert_eq!(sc.downcast_ref::<String>().map(String::as_str), Some("payload"));
    }

    #[test]
    fn test_execution_error_display_names_component() {
        let err = ExecutionError::new(
            "my::Behavior",
            "my::Request",
            CorrelationId(7),
            "boom".into(),
        );
        let msg = err.to_string();
        assert!(msg.contains("my::Behavior"));
        assert!(msg.contains("my::Request"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_aggregate_error_reports_count() {
        let err = AggregateError {
            errors: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.len(), 2);
        assert!(err.to_string().contains('2'));
    }
}
