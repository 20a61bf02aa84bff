//! Per-invocation mutable state shared along one behavior chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::id::CorrelationId;

/// Mutable state bag passed by reference through one pipeline's behaviors and
/// terminal handler.
///
/// A context is created fresh for every `send`/`stream` invocation, owned
/// exclusively by that invocation, and dropped when it finishes. Concurrent
/// invocations never share an instance; there is deliberately no `Default`
/// and no global instance, so sharing cannot happen by accident. Because no
/// two concurrent actors ever hold the same context, no locking is needed.
///
/// Items are keyed by type: store a dedicated newtype per piece of state and
/// read it back with the same type.
///
/// # Example
///
/// ```
/// use courier::id::CorrelationId;
/// use courier::pipeline::PipelineContext;
///
/// struct RetryBudget(u32);
///
/// let mut ctx = PipelineContext::new(CorrelationId(1));
/// ctx.insert(RetryBudget(3));
/// assert_eq!(ctx.get::<RetryBudget>().map(|b| b.0), Some(3));
/// ```
pub struct PipelineContext {
    correlation_id: CorrelationId,
    items: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl PipelineContext {
    /// Create a fresh context for one invocation.
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            items: HashMap::new(),
        }
    }

    /// Correlation id of the invocation this context belongs to.
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Store an item, returning the previous value of the same type if any.
    pub fn insert<T: Send + 'static>(&mut self, value: T) -> Option<T> {
        self.items
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Borrow an item by type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.items
            .get(&TypeId::of::<T>())
            .and_then(|item| item.downcast_ref::<T>())
    }

    /// Mutably borrow an item by type.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.items
            .get_mut(&TypeId::of::<T>())
            .and_then(|item| item.downcast_mut::<T>())
    }

    /// Remove and return an item by type.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.items
            .remove(&TypeId::of::<T>())
            .and_then(|item| item.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// True when an item of type `T` is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.items.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no items are stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("correlation_id", &self.correlation_id)
            .field("items", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flag(bool);
    struct Counter(u32);

    #[test]
    fn test_insert_get_roundtrip() {
        let mut ctx = PipelineContext::new(CorrelationId(1));
        assert!(ctx.is_empty());

        ctx.insert(Counter(1));
        ctx.insert(Flag(true));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.get::<Counter>().map(|c| c.0), Some(1));
        assert!(ctx.get::<Flag>().map(|f| f.0).unwrap());
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut ctx = PipelineContext::new(CorrelationId(1));
        assert!(ctx.insert(Counter(1)).is_none());
        let previous = ctx.insert(Counter(2)).unwrap();
        assert_eq!(previous.0, 1);
        assert_eq!(ctx.get::<Counter>().map(|c| c.0), Some(2));
    }

    #[test]
    fn test_get_mut_and_remove() {
        let mut ctx = PipelineContext::new(CorrelationId(1));
        ctx.insert(Counter(1));
        ctx.get_mut::<Counter>().unwrap().0 += 10;
        assert_eq!(ctx.remove::<Counter>().map(|c| c.0), Some(11));
        assert!(!ctx.contains::<Counter>());
    }
}
