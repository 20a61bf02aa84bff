//! Chain building for streamed-response pipelines, plus the channel bridge
//! that hands the consumer a stream before setup has finished.
//!
//! The ordering and wrapping rules are identical to the single-response
//! chain in [`chain`](crate::pipeline::chain); every layer resolves to a
//! stream instead of a value.
//!
//! # Bridge
//!
//! Setup (running the behaviors and asking the handler for its stream) is
//! asynchronous, but the consumer must receive a pollable stream
//! immediately. The executor therefore returns the read end of a channel
//! right away and spawns a worker that drives setup and forwards elements:
//!
//! ```text
//!   consumer                        bridge worker
//!      │                                 │
//!      │◄── rx (returned synchronously)  │
//!      │                                 ├─ run setup chain
//!      │                                 ├─ forward item ──► tx
//!      │◄── item ─────────────────────── │
//!      │                                 ├─ forward Err ──► tx, then stop
//!      │◄── err, then end of stream ──── │
//! ```
//!
//! The bridge closes when the source completes, and forwards the first
//! upstream error then closes: cancel-on-error, no elements are delivered
//! after an error.

use std::any::type_name;
use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{BoxError, ConfigurationError, ExecutionError, PipelineError};
use crate::id::CorrelationId;
use crate::pipeline::chain::classify;
use crate::pipeline::context::PipelineContext;
use crate::registration::{Order, StreamBehaviorRegistration};

/// Lazily produced sequence of response elements.
///
/// Each element is itself fallible; an `Err` element terminates the stream
/// (cancel-on-error).
pub type ResponseStream<T> = BoxStream<'static, Result<T, BoxError>>;

/// A typed message routed through a behavior chain to exactly one streaming
/// handler, producing a sequence of elements.
pub trait StreamRequest: Send + Sync + 'static {
    /// Element type produced by the terminal handler's stream.
    type Item: Send + 'static;
}

/// Terminal handler for a streamed-response pipeline.
#[async_trait]
pub trait StreamRequestHandler<R: StreamRequest>: Send + Sync {
    /// Produce the response stream for the request.
    ///
    /// The stream itself may be lazy; elements are pulled by the bridge
    /// worker after setup completes.
    async fn handle(
        &self,
        request: &R,
        ctx: &mut PipelineContext,
    ) -> Result<ResponseStream<R::Item>, BoxError>;

    /// Component name used for failure attribution.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Middleware for streamed-response pipelines.
///
/// A stream behavior resolves to a stream: usually the one obtained from
/// `next.run(..)`, possibly wrapped; returning an alternate stream without
/// calling `next` short-circuits the chain, and the consumer receives exactly
/// the alternate stream's elements.
#[async_trait]
pub trait StreamBehavior<R: StreamRequest>: Send + Sync {
    /// Preferred execution slot; the registry copies this into the
    /// registration at registration time.
    fn order(&self) -> Order {
        Order::default()
    }

    /// Take part in stream setup, then (usually) delegate to `next`.
    async fn handle(
        &self,
        request: &R,
        ctx: &mut PipelineContext,
        next: StreamNext<R>,
    ) -> Result<ResponseStream<R::Item>, PipelineError>;

    /// Component name used for failure attribution.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<R: StreamRequest> std::fmt::Debug for dyn StreamBehavior<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBehavior")
            .field("name", &self.name())
            .finish()
    }
}

/// Continuation handed to each stream behavior; the streaming counterpart of
/// [`Next`](crate::pipeline::chain::Next).
pub struct StreamNext<R: StreamRequest> {
    layers: VecDeque<Arc<dyn StreamBehavior<R>>>,
    handler: Arc<dyn StreamRequestHandler<R>>,
    correlation_id: CorrelationId,
}

impl<R: StreamRequest> StreamNext<R> {
    pub(crate) fn new(
        behaviors: Vec<Arc<dyn StreamBehavior<R>>>,
        handler: Arc<dyn StreamRequestHandler<R>>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            layers: behaviors.into(),
            handler,
            correlation_id,
        }
    }

    /// Run the remainder of the setup chain, resolving to a stream.
    ///
    /// Classification mirrors the single-response chain: short-circuits and
    /// already-wrapped execution errors pass through, everything else is
    /// wrapped naming the layer it crossed.
    pub async fn run(
        mut self,
        request: &R,
        ctx: &mut PipelineContext,
    ) -> Result<ResponseStream<R::Item>, PipelineError> {
        let correlation_id = self.correlation_id;
        match self.layers.pop_front() {
            Some(behavior) => {
                let component = behavior.name();
                behavior
                    .handle(request, ctx, self)
                    .await
                    .map_err(|err| classify(err, component, type_name::<R>(), correlation_id))
            }
            None => {
                let component = self.handler.name();
                self.handler.handle(request, ctx).await.map_err(|source| {
                    PipelineError::Execution(ExecutionError::new(
                        component,
                        type_name::<R>(),
                        correlation_id,
                        source,
                    ))
                })
            }
        }
    }
}

impl<R: StreamRequest> std::fmt::Debug for StreamNext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamNext")
            .field("remaining_layers", &self.layers.len())
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// A fully assembled streamed-response pipeline, ready for the bridge.
///
/// Owns the request and the per-invocation context; both live only as long
/// as setup (the context is dropped once the handler's stream is resolved).
pub struct StreamChain<R: StreamRequest> {
    request: R,
    context: PipelineContext,
    next: StreamNext<R>,
}

impl<R: StreamRequest> StreamChain<R> {
    pub(crate) fn new(request: R, context: PipelineContext, next: StreamNext<R>) -> Self {
        Self {
            request,
            context,
            next,
        }
    }

    /// Correlation id of this invocation.
    pub fn correlation_id(&self) -> CorrelationId {
        self.next.correlation_id
    }

    /// Run the setup chain, resolving to the response stream.
    pub async fn run(self) -> Result<ResponseStream<R::Item>, PipelineError> {
        let StreamChain {
            request,
            mut context,
            next,
        } = self;
        next.run(&request, &mut context).await
    }
}

/// Instantiate stream behaviors from pre-sorted registrations.
///
/// Same contract as [`instantiate_behaviors`]: pre-sorted, pre-filtered
/// input; a factory failure aborts with a [`ConfigurationError`] naming the
/// registration's description.
///
/// [`instantiate_behaviors`]: crate::pipeline::chain::instantiate_behaviors
pub fn instantiate_stream_behaviors<R: StreamRequest>(
    request: &R,
    registrations: &[StreamBehaviorRegistration<R>],
    correlation_id: CorrelationId,
) -> Result<Vec<Arc<dyn StreamBehavior<R>>>, ConfigurationError> {
    debug_assert!(
        registrations.windows(2).all(|w| w[0].order() <= w[1].order()),
        "stream behavior registrations must be pre-sorted ascending by order"
    );
    debug_assert!(
        registrations.iter().all(|r| r.applies_to(request)),
        "stream behavior registrations must be pre-filtered for applicability"
    );
    tracing::debug!(
        %correlation_id,
        request_type = type_name::<R>(),
        count = registrations.len(),
        "instantiating stream behaviors"
    );
    registrations
        .iter()
        .map(|registration| {
            registration
                .build()
                .map_err(|source| ConfigurationError::new(registration.description(), source))
        })
        .collect()
}
