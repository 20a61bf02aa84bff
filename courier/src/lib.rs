//! # Courier
//!
//! In-process dispatch engine routing typed messages to registered handlers
//! through two execution models:
//!
//! - a single-consumer **request pipeline** wrapping one terminal handler
//!   with an ordered chain of middleware behaviors, producing either a single
//!   deferred response or a lazily produced stream of responses, and
//! - a multi-consumer **notification dispatcher** fanning one event out to
//!   many handlers under three ordered phases and a configurable error
//!   strategy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    facade (external)                        │
//! │   registry lookup · stable sort · context + id creation     │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  pipeline                    │  dispatch                    │
//! │  • PipelineExecutor          │  • NotificationDispatcher    │
//! │  • Next / FutureChain        │  • three phase barriers      │
//! │  • StreamNext / StreamChain  │  • DispatchStrategy          │
//! │  • channel bridge            │                              │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │  registration · PipelineContext · CorrelationId · errors    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registration registry and the facade that wires everything together
//! are collaborators, not part of this crate's core: callers resolve and
//! stably sort registrations, mint a [`CorrelationId`], and create one
//! [`PipelineContext`] per invocation before calling in.
//!
//! ## Quick Start
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let behaviors = PipelineExecutor::instantiate_behaviors(&req, &sorted, id)?;
//! let ctx = PipelineContext::new(id);
//! let chain = PipelineExecutor::build_future_chain(handler, behaviors, req, ctx, id);
//! let response = PipelineExecutor::execute_future(chain).await?;
//! ```
//!
//! [`CorrelationId`]: crate::id::CorrelationId
//! [`PipelineContext`]: crate::pipeline::PipelineContext

#![deny(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod prelude;
pub mod registration;

pub use dispatch::{DispatchStrategy, Notification, NotificationDispatcher, NotificationHandler};
pub use error::{
    AggregateError, BoxError, ConfigurationError, ExecutionError, PipelineError, ShortCircuit,
};
pub use id::{CorrelationId, CorrelationIdFactory};
pub use pipeline::{
    FutureChain, Next, PipelineBehavior, PipelineContext, PipelineExecutor, Request,
    RequestHandler, ResponseStream, StreamBehavior, StreamChain, StreamNext, StreamRequest,
    StreamRequestHandler,
};
pub use registration::{
    BehaviorRegistration, NotificationRegistration, Order, Phase, StreamBehaviorRegistration,
};
