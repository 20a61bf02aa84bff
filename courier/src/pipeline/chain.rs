//! Chain building and execution for single-response pipelines.
//!
//! # Architecture
//!
//! A chain is the onion of behaviors around one terminal handler:
//!
//! ```text
//! ┌─ behavior(order = -10) ───────────────────────┐
//! │  ┌─ behavior(order = 0) ──────────────────┐   │
//! │  │  ┌─ behavior(order = 7) ───────────┐   │   │
//! │  │  │                                 │   │   │
//! │  │  │        terminal handler         │   │   │
//! │  │  │                                 │   │   │
//! │  │  └─────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Rather than nesting closures innermost-outward, the chain is expressed as
//! a [`Next`] continuation that pops behaviors in ascending-order position:
//! the behavior with the smallest order runs first (outermost), and the
//! terminal handler runs when no behaviors remain. The observable execution
//! order is identical to closure nesting; only the mechanism differs.
//!
//! Within one chain there is no concurrency: one behavior or handler runs at
//! a time, by construction.
//!
//! # Failure classification
//!
//! [`Next::run`] classifies the outcome of every layer it invokes, at the
//! point the outcome crosses that layer's boundary:
//!
//! - [`ShortCircuit`] passes through unchanged, all the way to the caller,
//! - an already-wrapped [`ExecutionError`] passes through unchanged (never
//!   double-wrapped),
//! - anything else is wrapped into an [`ExecutionError`] naming the layer.
//!
//! [`ShortCircuit`]: crate::error::ShortCircuit

use std::any::type_name;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{ConfigurationError, ExecutionError, PipelineError};
use crate::id::CorrelationId;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::traits::{PipelineBehavior, Request, RequestHandler};
use crate::registration::BehaviorRegistration;

/// Continuation handed to each behavior, representing the remainder of the
/// chain (the behaviors after it, then the terminal handler).
///
/// `Next` is consumed by [`run`](Next::run); a behavior that drops it without
/// running it short-circuits the chain with its own return value.
pub struct Next<R: Request> {
    layers: VecDeque<Arc<dyn PipelineBehavior<R>>>,
    handler: Arc<dyn RequestHandler<R>>,
    correlation_id: CorrelationId,
}

impl<R: Request> Next<R> {
    pub(crate) fn new(
        behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
        handler: Arc<dyn RequestHandler<R>>,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            layers: behaviors.into(),
            handler,
            correlation_id,
        }
    }

    /// Run the remainder of the chain.
    ///
    /// Invokes the next behavior (or the terminal handler, when none remain)
    /// and classifies its outcome as it crosses the layer boundary.
    pub async fn run(
        mut self,
        request: &R,
        ctx: &mut PipelineContext,
    ) -> Result<R::Response, PipelineError> {
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

impl<R: Request> std::fmt::Debug for Next<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining_layers", &self.layers.len())
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Classify an error crossing a behavior boundary.
///
/// Short-circuits and already-wrapped execution errors pass through; anything
/// else becomes an [`ExecutionError`] attributed to `component`.
pub(crate) fn classify(
    err: PipelineError,
    component: &'static str,
    request_type: &'static str,
    correlation_id: CorrelationId,
) -> PipelineError {
    match err {
        PipelineError::ShortCircuit(_) | PipelineError::Execution(_) => err,
        PipelineError::Configuration(defect) => PipelineError::Execution(ExecutionError::new(
            component,
            request_type,
            correlation_id,
            Box::new(defect),
        )),
        PipelineError::Failure(source) => PipelineError::Execution(ExecutionError::new(
            component,
            request_type,
            correlation_id,
            source,
        )),
    }
}

/// A fully assembled single-response pipeline, ready to run once.
///
/// Owns the request, the per-invocation context, and the behavior chain.
pub struct FutureChain<R: Request> {
    request: R,
    context: PipelineContext,
    next: Next<R>,
}

impl<R: Request> FutureChain<R> {
    pub(crate) fn new(request: R, context: PipelineContext, next: Next<R>) -> Self {
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

    /// Run the chain to completion.
    ///
    /// The context is dropped when the invocation finishes; it is never
    /// reused.
    pub async fn run(self) -> Result<R::Response, PipelineError> {
        let FutureChain {
            request,
            mut context,
            next,
        } = self;
        next.run(&request, &mut context).await
    }
}

/// Instantiate behaviors from pre-sorted registrations.
///
/// The caller owns applicability filtering and must supply the registrations
/// already sorted ascending by order, stably (ties keep registration
/// sequence). Each factory is invoked once; a factory failure aborts with a
/// [`ConfigurationError`] naming the registration's description.
pub fn instantiate_behaviors<R: Request>(
    request: &R,
    registrations: &[BehaviorRegistration<R>],
    correlation_id: CorrelationId,
) -> Result<Vec<Arc<dyn PipelineBehavior<R>>>, ConfigurationError> {
    debug_assert!(
        registrations.windows(2).all(|w| w[0].order() <= w[1].order()),
        "behavior registrations must be pre-sorted ascending by order"
    );
    debug_assert!(
        registrations.iter().all(|r| r.applies_to(request)),
        "behavior registrations must be pre-filtered for applicability"
    );
    tracing::debug!(
        %correlation_id,
        request_type = type_name::<R>(),
        count = registrations.len(),
        "instantiating pipeline behaviors"
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
