//! The pipeline executor: builds chains and runs them.
//!
//! `PipelineExecutor` is the surface the facade calls into. It is stateless;
//! everything an invocation needs (behaviors, handler, request, context,
//! correlation id) is passed in and owned by the resulting chain.
//!
//! The execute entry points are deliberately thin: [`execute_future`] only
//! classifies the outcome for tracing and never alters what propagates;
//! [`execute_stream`] owns the channel bridge that makes stream setup
//! asynchronous while the consumer gets a pollable stream synchronously.
//!
//! [`execute_future`]: PipelineExecutor::execute_future
//! [`execute_stream`]: PipelineExecutor::execute_stream

use std::any::type_name;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::StreamExt;

use crate::error::{BoxError, ConfigurationError, PipelineError};
use crate::id::CorrelationId;
use crate::pipeline::chain::{instantiate_behaviors, FutureChain, Next};
use crate::pipeline::context::PipelineContext;
use crate::pipeline::stream::{
    instantiate_stream_behaviors, ResponseStream, StreamBehavior, StreamChain, StreamNext,
    StreamRequest, StreamRequestHandler,
};
use crate::pipeline::traits::{PipelineBehavior, Request, RequestHandler};
use crate::registration::{BehaviorRegistration, StreamBehaviorRegistration};

/// Builds behavior chains and executes them, attributing failures precisely.
#[derive(Debug, Default)]
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Instantiate behaviors from pre-sorted, pre-filtered registrations.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] naming the registration whose factory failed.
    pub fn instantiate_behaviors<R: Request>(
        request: &R,
        registrations: &[BehaviorRegistration<R>],
        correlation_id: CorrelationId,
    ) -> Result<Vec<Arc<dyn PipelineBehavior<R>>>, ConfigurationError> {
        instantiate_behaviors(request, registrations, correlation_id)
    }

    /// Instantiate stream behaviors from pre-sorted, pre-filtered
    /// registrations.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] naming the registration whose factory failed.
    pub fn instantiate_stream_behaviors<R: StreamRequest>(
        request: &R,
        registrations: &[StreamBehaviorRegistration<R>],
        correlation_id: CorrelationId,
    ) -> Result<Vec<Arc<dyn StreamBehavior<R>>>, ConfigurationError> {
        instantiate_stream_behaviors(request, registrations, correlation_id)
    }

    /// Assemble a single-response chain.
    ///
    /// `behaviors` must be in ascending-order position (as produced by
    /// [`instantiate_behaviors`](Self::instantiate_behaviors) from sorted
    /// registrations); the first behavior runs outermost.
    pub fn build_future_chain<R: Request>(
        handler: Arc<dyn RequestHandler<R>>,
        behaviors: Vec<Arc<dyn PipelineBehavior<R>>>,
        request: R,
        context: PipelineContext,
        correlation_id: CorrelationId,
    ) -> FutureChain<R> {
        FutureChain::new(request, context, Next::new(behaviors, handler, correlation_id))
    }

    /// Assemble a streamed-response chain.
    pub fn build_stream_chain<R: StreamRequest>(
        handler: Arc<dyn StreamRequestHandler<R>>,
        behaviors: Vec<Arc<dyn StreamBehavior<R>>>,
        request: R,
        context: PipelineContext,
        correlation_id: CorrelationId,
    ) -> StreamChain<R> {
        StreamChain::new(
            request,
            context,
            StreamNext::new(behaviors, handler, correlation_id),
        )
    }

    /// Run a single-response chain to completion.
    ///
    /// Classifies the outcome for observability (success vs short-circuit vs
    /// failure) but never alters which value or error propagates.
    pub async fn execute_future<R: Request>(
        chain: FutureChain<R>,
    ) -> Result<R::Response, PipelineError> {
        let correlation_id = chain.correlation_id();
        let request_type = type_name::<R>();
        match chain.run().await {
            Ok(response) => {
                tracing::debug!(%correlation_id, request_type, "pipeline completed");
                Ok(response)
            }
            Err(PipelineError::ShortCircuit(signal)) => {
                tracing::debug!(
                    %correlation_id,
                    request_type,
                    description = signal.description(),
                    "pipeline short-circuited"
                );
                Err(PipelineError::ShortCircuit(signal))
            }
            Err(err) => {
                tracing::warn!(%correlation_id, request_type, error = %err, "pipeline failed");
                Err(err)
            }
        }
    }

    /// Run a streamed-response chain, returning a consumable stream
    /// immediately.
    ///
    /// Setup runs in a spawned bridge worker; the returned stream yields
    /// elements as the worker forwards them. A setup failure becomes the
    /// single (error) element of the stream. The first upstream error is
    /// forwarded and then the bridge closes - no further elements are
    /// delivered (cancel-on-error). Dropping the returned stream stops the
    /// worker at its next send.
    ///
    /// Must be called from within a tokio runtime.
    pub fn execute_stream<R: StreamRequest>(chain: StreamChain<R>) -> ResponseStream<R::Item> {
        let correlation_id = chain.correlation_id();
        let request_type = type_name::<R>();
        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            let mut source = match chain.run().await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::warn!(
                        %correlation_id,
                        request_type,
                        error = %err,
                        "stream pipeline setup failed"
                    );
                    let _ = tx.unbounded_send(Err(Box::new(err) as BoxError));
                    return;
                }
            };
            tracing::debug!(%correlation_id, request_type, "stream pipeline bridging");
            while let Some(item) = source.next().await {
                let failed = item.is_err();
                if tx.unbounded_send(item).is_err() {
                    // Consumer dropped the read end; stop pulling.
                    break;
                }
                if failed {
                    tracing::debug!(
                        %correlation_id,
                        request_type,
                        "stream pipeline closed after upstream error"
                    );
                    break;
                }
            }
        });
        rx.boxed()
    }
}
