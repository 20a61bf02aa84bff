//! Common imports for the courier dispatch engine.
//!
//! This module provides a convenient prelude for importing commonly used
//! types and traits.

pub use crate::dispatch::{
    DispatchStrategy, Notification, NotificationDispatcher, NotificationHandler,
};
pub use crate::error::{
    AggregateError, BoxError, ConfigurationError, ExecutionError, PipelineError, ShortCircuit,
};
pub use crate::id::{CorrelationId, CorrelationIdFactory};
pub use crate::pipeline::{
    FutureChain, Next, PipelineBehavior, PipelineContext, PipelineExecutor, Request,
    RequestHandler, ResponseStream, StreamBehavior, StreamChain, StreamNext, StreamRequest,
    StreamRequestHandler,
};
pub use crate::registration::{
    BehaviorRegistration, NotificationRegistration, Order, Phase, StreamBehaviorRegistration,
};

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use std::sync::Arc;
