//! Capability contracts consumed by the pipeline core.
//!
//! These traits are implemented by application code and invoked by the chain
//! runner. The core never implements them itself; it only arranges and calls
//! them.
//!
//! Every contract exposes a `name()` used for failure attribution: when a
//! behavior or handler fails, the wrapping [`ExecutionError`] names the
//! concrete component type even though the chain only holds trait objects.
//! The default body reports `std::any::type_name::<Self>()`.
//!
//! [`ExecutionError`]: crate::error::ExecutionError

use async_trait::async_trait;

use crate::error::{BoxError, PipelineError};
use crate::pipeline::chain::Next;
use crate::pipeline::context::PipelineContext;
use crate::registration::Order;

/// A typed message routed through a behavior chain to exactly one handler,
/// producing a single response.
pub trait Request: Send + Sync + 'static {
    /// Response type produced by the terminal handler.
    type Response: Send + 'static;
}

/// Terminal handler for a request pipeline.
///
/// Exactly one handler terminates each chain. Failures are reported as
/// [`BoxError`] and wrapped by the chain runner with the handler's name.
#[async_trait]
pub trait RequestHandler<R: Request>: Send + Sync {
    /// Process the request and produce the response.
    async fn handle(
        &self,
        request: &R,
        ctx: &mut PipelineContext,
    ) -> Result<R::Response, BoxError>;

    /// Component name used for failure attribution.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A middleware unit wrapping the remainder of a pipeline.
///
/// Behaviors run in ascending [`Order`], the smallest order outermost. A
/// behavior may:
///
/// - delegate onward with `next.run(request, ctx).await`,
/// - return `Ok(response)` **without** calling `next`, which short-circuits
///   the chain (downstream behaviors and the handler never run),
/// - return [`PipelineError::ShortCircuit`] to halt the chain with a typed
///   payload that reaches the original caller unwrapped,
/// - return any other error, which the enclosing layer wraps with this
///   behavior's name.
#[async_trait]
pub trait PipelineBehavior<R: Request>: Send + Sync {
    /// Preferred execution slot; the registry copies this into the
    /// registration at registration time.
    fn order(&self) -> Order {
        Order::default()
    }

    /// Inspect or modify the invocation, then (usually) delegate to `next`.
    async fn handle(
        &self,
        request: &R,
        ctx: &mut PipelineContext,
        next: Next<R>,
    ) -> Result<R::Response, PipelineError>;

    /// Component name used for failure attribution.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<R: Request> std::fmt::Debug for dyn PipelineBehavior<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBehavior")
            .field("name", &self.name())
            .finish()
    }
}
