//! Request pipeline: context, capability contracts, chain builder and
//! runner.

pub mod chain;
pub mod context;
pub mod executor;
pub mod stream;
pub mod traits;

// Re-exports
pub use chain::{FutureChain, Next};
pub use context::PipelineContext;
pub use executor::PipelineExecutor;
pub use stream::{
    ResponseStream, StreamBehavior, StreamChain, StreamNext, StreamRequest, StreamRequestHandler,
};
pub use traits::{PipelineBehavior, Request, RequestHandler};
