//! Registrations: the (factory, order) records consumed by the chain builder
//! and the notification dispatcher.
//!
//! Registrations are created by application code and stored by the external
//! registry; this module only defines their shape and the [`Order`] domain
//! that drives both pipeline sorting and notification phase partitioning.
//!
//! # Ordering domain
//!
//! A single `i32` carries both concerns. Two sentinel values mark a
//! notification registration as belonging to a parallel phase; every other
//! value is a sequential slot:
//!
//! ```text
//! i32::MIN                    ...any other value...                 i32::MAX
//!    │                                  │                               │
//!    ▼                                  ▼                               ▼
//! ParallelEarly              sequential slot (sorted asc)        ParallelLate
//! ```

use std::fmt;
use std::sync::Arc;

use crate::dispatch::{Notification, NotificationHandler};
use crate::error::BoxError;
use crate::pipeline::{PipelineBehavior, Request, StreamBehavior, StreamRequest};

/// Execution slot of a registration.
///
/// Wraps a plain `i32`; the minimum and maximum representable values are
/// reserved as phase sentinels (see [`Order::phase`]). Pipelines only use the
/// relative order; the sentinels matter to the notification dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Order(pub i32);

impl Order {
    /// Sentinel: run before all sequential handlers, in parallel with other
    /// early handlers.
    pub const PARALLEL_EARLY: Order = Order(i32::MIN);

    /// Sentinel: run after all sequential handlers, in parallel with other
    /// late handlers.
    pub const PARALLEL_LATE: Order = Order(i32::MAX);

    /// Create an order from a raw slot value.
    pub const fn new(value: i32) -> Self {
        Order(value)
    }

    /// Notification phase derived purely from value comparison.
    pub const fn phase(self) -> Phase {
        match self.0 {
            i32::MIN => Phase::EarlyParallel,
            i32::MAX => Phase::LateParallel,
            _ => Phase::Sequential,
        }
    }

    /// True for either parallel sentinel.
    pub const fn is_parallel(self) -> bool {
        !matches!(self.phase(), Phase::Sequential)
    }
}

impl From<i32> for Order {
    fn from(value: i32) -> Self {
        Order(value)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase() {
            Phase::EarlyParallel => f.write_str("ParallelEarly"),
            Phase::LateParallel => f.write_str("ParallelLate"),
            Phase::Sequential => write!(f, "{}", self.0),
        }
    }
}

/// One of the three notification execution groups.
///
/// Phases execute as strict barriers: no sequential handler starts before
/// every early-parallel handler finished, and no late-parallel handler starts
/// before every sequential handler finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Parallel batch executed before the sequential phase.
    EarlyParallel,
    /// Handlers executed one at a time, ascending by order.
    Sequential,
    /// Parallel batch executed after the sequential phase.
    LateParallel,
}

/// Factory producing a fresh behavior instance per invocation.
pub type BehaviorFactory<R> =
    Arc<dyn Fn() -> Result<Arc<dyn PipelineBehavior<R>>, BoxError> + Send + Sync>;

/// Factory producing a fresh stream behavior instance per invocation.
pub type StreamBehaviorFactory<R> =
    Arc<dyn Fn() -> Result<Arc<dyn StreamBehavior<R>>, BoxError> + Send + Sync>;

/// Factory producing a fresh notification handler instance per dispatch.
pub type NotificationHandlerFactory<N> =
    Arc<dyn Fn() -> Result<Arc<dyn NotificationHandler<N>>, BoxError> + Send + Sync>;

/// Predicate deciding whether a behavior applies to a given request.
///
/// Evaluated by the external registry while resolving registrations; the
/// chain builder receives only registrations that already passed it.
pub type RequestPredicate<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// A pipeline behavior registration: order, factory, applicability predicate,
/// and a description used in configuration-error reports.
///
/// Immutable once created. Many registrations may exist per request type; the
/// registry filters them by predicate and sorts them (stably, ascending by
/// order) before handing them to the chain builder.
pub struct BehaviorRegistration<R: Request> {
    order: Order,
    factory: BehaviorFactory<R>,
    predicate: RequestPredicate<R>,
    description: String,
}

impl<R: Request> BehaviorRegistration<R> {
    /// Register a behavior factory that applies to every request.
    pub fn new<F>(order: impl Into<Order>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn PipelineBehavior<R>>, BoxError> + Send + Sync + 'static,
    {
        Self {
            order: order.into(),
            factory: Arc::new(factory),
            predicate: Arc::new(|_| true),
            description: description.into(),
        }
    }

    /// Restrict the registration to requests matching `predicate`.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Execution slot of the behavior.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Description used when instantiation fails.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate the applicability predicate for `request`.
    pub fn applies_to(&self, request: &R) -> bool {
        (self.predicate)(request)
    }

    /// Run the factory, producing a fresh behavior instance.
    pub fn build(&self) -> Result<Arc<dyn PipelineBehavior<R>>, BoxError> {
        (self.factory)()
    }
}

impl<R: Request> Clone for BehaviorRegistration<R> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            factory: Arc::clone(&self.factory),
            predicate: Arc::clone(&self.predicate),
            description: self.description.clone(),
        }
    }
}

impl<R: Request> fmt::Debug for BehaviorRegistration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorRegistration")
            .field("order", &self.order)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A stream behavior registration; same shape as [`BehaviorRegistration`]
/// over the streaming capability.
pub struct StreamBehaviorRegistration<R: StreamRequest> {
    order: Order,
    factory: StreamBehaviorFactory<R>,
    predicate: RequestPredicate<R>,
    description: String,
}

impl<R: StreamRequest> StreamBehaviorRegistration<R> {
    /// Register a stream behavior factory that applies to every request.
    pub fn new<F>(order: impl Into<Order>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn StreamBehavior<R>>, BoxError> + Send + Sync + 'static,
    {
        Self {
            order: order.into(),
            factory: Arc::new(factory),
            predicate: Arc::new(|_| true),
            description: description.into(),
        }
    }

    /// Restrict the registration to requests matching `predicate`.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Execution slot of the behavior.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Description used when instantiation fails.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate the applicability predicate for `request`.
    pub fn applies_to(&self, request: &R) -> bool {
        (self.predicate)(request)
    }

    /// Run the factory, producing a fresh behavior instance.
    pub fn build(&self) -> Result<Arc<dyn StreamBehavior<R>>, BoxError> {
        (self.factory)()
    }
}

impl<R: StreamRequest> Clone for StreamBehaviorRegistration<R> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            factory: Arc::clone(&self.factory),
            predicate: Arc::clone(&self.predicate),
            description: self.description.clone(),
        }
    }
}

impl<R: StreamRequest> fmt::Debug for StreamBehaviorRegistration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBehaviorRegistration")
            .field("order", &self.order)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A notification handler registration.
///
/// Many may exist per notification type. The order decides the phase (via the
/// sentinels) and the slot within the sequential phase; the description names
/// the registration in dispatch error reports.
pub struct NotificationRegistration<N: Notification> {
    order: Order,
    factory: NotificationHandlerFactory<N>,
    description: String,
}

impl<N: Notification> NotificationRegistration<N> {
    /// Register a notification handler factory.
    pub fn new<F>(order: impl Into<Order>, description: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn NotificationHandler<N>>, BoxError> + Send + Sync + 'static,
    {
        Self {
            order: order.into(),
            factory: Arc::new(factory),
            description: description.into(),
        }
    }

    /// Execution slot (and phase, via the sentinels) of the handler.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Description used when the factory or handler fails.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the factory, producing a fresh handler instance.
    pub fn build(&self) -> Result<Arc<dyn NotificationHandler<N>>, BoxError> {
        (self.factory)()
    }
}

impl<N: Notification> Clone for NotificationRegistration<N> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            factory: Arc::clone(&self.factory),
            description: self.description.clone(),
        }
    }
}

impl<N: Notification> fmt::Debug for NotificationRegistration<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationRegistration")
            .field("order", &self.order)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
