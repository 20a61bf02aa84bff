//! Correlation identifiers for invocation tracing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Integer tag attached to one pipeline or dispatch invocation.
///
/// The id has no semantics beyond log correlation: every error wrapped by the
/// chain runner and every dispatcher log line carries the id of the
/// invocation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator of monotonically increasing correlation ids.
///
/// The facade owns one factory and stamps every `send`/`stream`/`publish`
/// invocation with a fresh id.
///
/// # Example
///
/// ```
/// use courier::id::CorrelationIdFactory;
///
/// let factory = CorrelationIdFactory::new();
/// let id1 = factory.next();
/// let id2 = factory.next();
/// assert!(id2 > id1);
/// ```
#[derive(Debug)]
pub struct CorrelationIdFactory {
    next_id: AtomicU64,
}

impl CorrelationIdFactory {
    /// Create a new factory starting from 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Generate the next correlation id.
    pub fn next(&self) -> CorrelationId {
        CorrelationId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CorrelationIdFactory {
    fn default() -> Self {
        Self::new()
    }
}
