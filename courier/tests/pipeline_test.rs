//! Integration tests for the single-response pipeline.
//!
//! Tests cover:
//! - Behavior execution order (ascending by order, stable ties)
//! - Short-circuiting by returning without `next` and by `ShortCircuit`
//! - Failure classification and single wrapping
//! - Context threading within one invocation and isolation across
//!   concurrent invocations

use std::any::type_name;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier::prelude::*;

struct Ping {
    value: u64,
}

impl Request for Ping {
    type Response = u64;
}

struct PingHandler {
    invoked: Arc<AtomicBool>,
}

#[async_trait]
impl RequestHandler<Ping> for PingHandler {
    async fn handle(&self, request: &Ping, _ctx: &mut PipelineContext) -> Result<u64, BoxError> {
        self.invoked.store(true, Ordering::SeqCst);
        Ok(request.value)
    }
}

struct FailingHandler;

#[async_trait]
impl RequestHandler<Ping> for FailingHandler {
    async fn handle(&self, _request: &Ping, _ctx: &mut PipelineContext) -> Result<u64, BoxError> {
        Err("handler boom".into())
    }
}

/// Behavior that records start/end events around its delegation.
struct Tag {
    tag: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PipelineBehavior<Ping> for Tag {
    async fn handle(
        &self,
        request: &Ping,
        ctx: &mut PipelineContext,
        next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        self.log.lock().unwrap().push(format!("{}:start", self.tag));
        let out = next.run(request, ctx).await;
        self.log.lock().unwrap().push(format!("{}:end", self.tag));
        out
    }
}

/// Behavior that answers directly without delegating.
struct Static(u64);

#[async_trait]
impl PipelineBehavior<Ping> for Static {
    async fn handle(
        &self,
        _request: &Ping,
        _ctx: &mut PipelineContext,
        _next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        Ok(self.0)
    }
}

/// Behavior that halts the chain with a typed payload.
struct CacheHit;

#[async_trait]
impl PipelineBehavior<Ping> for CacheHit {
    async fn handle(
        &self,
        _request: &Ping,
        _ctx: &mut PipelineContext,
        _next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        Err(PipelineError::short_circuit(99u64, "cache hit"))
    }
}

/// Behavior that fails with its own raw error.
struct Exploder;

#[async_trait]
impl PipelineBehavior<Ping> for Exploder {
    async fn handle(
        &self,
        _request: &Ping,
        _ctx: &mut PipelineContext,
        _next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        Err(PipelineError::failure("behavior boom"))
    }
}

fn ping_handler() -> (Arc<dyn RequestHandler<Ping>>, Arc<AtomicBool>) {
    let invoked = Arc::new(AtomicBool::new(false));
    let handler = Arc::new(PingHandler {
        invoked: Arc::clone(&invoked),
    });
    (handler, invoked)
}

#[tokio::test]
async fn test_behaviors_run_in_ascending_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (handler, _) = ping_handler();
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> = vec![
        Arc::new(Tag {
            tag: "first",
            log: Arc::clone(&log),
        }),
        Arc::new(Tag {
            tag: "second",
            log: Arc::clone(&log),
        }),
        Arc::new(Tag {
            tag: "third",
            log: Arc::clone(&log),
        }),
    ];
    let id = CorrelationId(1);
    let chain = PipelineExecutor::build_future_chain(
        handler,
        behaviors,
        Ping { value: 7 },
        PipelineContext::new(id),
        id,
    );

    let response = PipelineExecutor::execute_future(chain).await.unwrap();

    assert_eq!(response, 7);
    let events = log.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "first:start",
            "second:start",
            "third:start",
            "third:end",
            "second:end",
            "first:end",
        ]
    );
}

#[tokio::test]
async fn test_tie_break_keeps_registration_sequence() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registrations: Vec<BehaviorRegistration<Ping>> = ["a", "b", "c"]
        .into_iter()
        .map(|tag| {
            let log = Arc::clone(&log);
            BehaviorRegistration::new(0, format!("tag-{tag}"), move || {
                Ok(Arc::new(Tag {
                    tag,
                    log: Arc::clone(&log),
                }) as Arc<dyn PipelineBehavior<Ping>>)
            })
        })
        .collect();

    let id = CorrelationId(2);
    let request = Ping { value: 1 };
    let behaviors =
        PipelineExecutor::instantiate_behaviors(&request, &registrations, id).unwrap();
    let (handler, _) = ping_handler();
    let chain = PipelineExecutor::build_future_chain(
        handler,
        behaviors,
        request,
        PipelineContext::new(id),
        id,
    );
    PipelineExecutor::execute_future(chain).await.unwrap();

    let events = log.lock().unwrap().clone();
    assert_eq!(events[..3], ["a:start", "b:start", "c:start"]);
}

#[tokio::test]
async fn test_short_circuit_by_returning_without_next() {
    let (handler, invoked) = ping_handler();
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> = vec![Arc::new(Static(42))];
    let id = CorrelationId(3);
    let chain = PipelineExecutor::build_future_chain(
        handler,
        behaviors,
        Ping { value: 7 },
        PipelineContext::new(id),
        id,
    );

    let response = PipelineExecutor::execute_future(chain).await.unwrap();

    assert_eq!(response, 42);
    assert!(!invoked.load(Ordering::SeqCst), "handler must never run");
}

#[tokio::test]
async fn test_short_circuit_signal_reaches_caller_unwrapped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (handler, invoked) = ping_handler();
    // Outer delegating behavior, then the short-circuiting one: the signal
    // must cross the outer layer without being wrapped.
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> = vec![
        Arc::new(Tag {
            tag: "outer",
            log: Arc::clone(&log),
        }),
        Arc::new(CacheHit),
    ];
    let id = CorrelationId(4);
    let chain = PipelineExecutor::build_future_chain(
        handler,
        behaviors,
        Ping { value: 7 },
        PipelineContext::new(id),
        id,
    );

    let err = PipelineExecutor::execute_future(chain).await.unwrap_err();
    match err {
        PipelineError::ShortCircuit(signal) => {
            assert_eq!(signal.description(), "cache hit");
            assert_eq!(signal.downcast::<u64>().unwrap(), 99);
        }
        other => panic!("expected short-circuit, got {other:?}"),
    }
    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_handler_failure_wrapped_once_naming_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> = vec![
        Arc::new(Tag {
            tag: "outer",
            log: Arc::clone(&log),
        }),
        Arc::new(Tag {
            tag: "inner",
            log,
        }),
    ];
    let id = CorrelationId(5);
    let chain = PipelineExecutor::build_future_chain(
        Arc::new(FailingHandler),
        behaviors,
        Ping { value: 7 },
        PipelineContext::new(id),
        id,
    );

    let err = PipelineExecutor::execute_future(chain).await.unwrap_err();
    match err {
        PipelineError::Execution(e) => {
            // Wrapped exactly once, at the handler boundary; the two
            // behavior layers passed it through untouched.
            assert_eq!(e.component, type_name::<FailingHandler>());
            assert_eq!(e.correlation_id, id);
            assert!(e.source.to_string().contains("handler boom"));
            assert!(e.source.downcast_ref::<ExecutionError>().is_none());
        }
        other => panic!("expected execution error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_behavior_failure_wrapped_naming_behavior() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (handler, invoked) = ping_handler();
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> = vec![
        Arc::new(Tag { tag: "outer", log }),
        Arc::new(Exploder),
    ];
    let id = CorrelationId(6);
    let chain = PipelineExecutor::build_future_chain(
        handler,
        behaviors,
        Ping { value: 7 },
        PipelineContext::new(id),
        id,
    );

    let err = PipelineExecutor::execute_future(chain).await.unwrap_err();
    match err {
        PipelineError::Execution(e) => {
            assert_eq!(e.component, type_name::<Exploder>());
        }
        other => panic!("expected execution error, got {other:?}"),
    }
    assert!(!invoked.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_factory_failure_surfaces_configuration_error() {
    let registrations = vec![BehaviorRegistration::<Ping>::new(
        0,
        "broken metrics behavior",
        || Err("factory boom".into()),
    )];
    let request = Ping { value: 1 };

    let err = PipelineExecutor::instantiate_behaviors(&request, &registrations, CorrelationId(7))
        .unwrap_err();

    assert_eq!(err.description, "broken metrics behavior");
    assert!(err.to_string().contains("factory boom"));
}

struct X(u64);
struct Y(u64);

/// Writes X into the context.
struct WriteX;

#[async_trait]
impl PipelineBehavior<Ping> for WriteX {
    async fn handle(
        &self,
        request: &Ping,
        ctx: &mut PipelineContext,
        next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        ctx.insert(X(1));
        next.run(request, ctx).await
    }
}

/// Reads X, writes Y = X + 1.
struct DeriveY;

#[async_trait]
impl PipelineBehavior<Ping> for DeriveY {
    async fn handle(
        &self,
        request: &Ping,
        ctx: &mut PipelineContext,
        next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        let x = ctx.get::<X>().map(|x| x.0).unwrap_or_default();
        ctx.insert(Y(x + 1));
        next.run(request, ctx).await
    }
}

struct ReadYHandler;

#[async_trait]
impl RequestHandler<Ping> for ReadYHandler {
    async fn handle(&self, _request: &Ping, ctx: &mut PipelineContext) -> Result<u64, BoxError> {
        Ok(ctx.get::<Y>().map(|y| y.0).unwrap_or_default())
    }
}

#[tokio::test]
async fn test_context_items_thread_through_the_chain() {
    let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> =
        vec![Arc::new(WriteX), Arc::new(DeriveY)];
    let id = CorrelationId(8);
    let chain = PipelineExecutor::build_future_chain(
        Arc::new(ReadYHandler),
        behaviors,
        Ping { value: 0 },
        PipelineContext::new(id),
        id,
    );

    let response = PipelineExecutor::execute_future(chain).await.unwrap();
    assert_eq!(response, 2);
}

struct Marker(u64);

/// Writes a per-invocation marker, yields, then checks nobody else touched
/// it.
struct IsolationProbe {
    value: u64,
}

#[async_trait]
impl PipelineBehavior<Ping> for IsolationProbe {
    async fn handle(
        &self,
        request: &Ping,
        ctx: &mut PipelineContext,
        next: Next<Ping>,
    ) -> Result<u64, PipelineError> {
        ctx.insert(Marker(self.value));
        tokio::time::sleep(Duration::from_millis(5)).await;
        let seen = ctx.get::<Marker>().map(|m| m.0);
        assert_eq!(seen, Some(self.value), "context leaked across invocations");
        next.run(request, ctx).await
    }
}

struct MarkerHandler;

#[async_trait]
impl RequestHandler<Ping> for MarkerHandler {
    async fn handle(&self, _request: &Ping, ctx: &mut PipelineContext) -> Result<u64, BoxError> {
        Ok(ctx.get::<Marker>().map(|m| m.0).unwrap_or_default())
    }
}

#[tokio::test]
async fn test_concurrent_invocations_never_share_context() {
    let make_chain = |value: u64, id: u64| {
        let behaviors: Vec<Arc<dyn PipelineBehavior<Ping>>> =
            vec![Arc::new(IsolationProbe { value })];
        let id = CorrelationId(id);
        PipelineExecutor::build_future_chain(
            Arc::new(MarkerHandler),
            behaviors,
            Ping { value },
            PipelineContext::new(id),
            id,
        )
    };

    let (a, b) = tokio::join!(
        PipelineExecutor::execute_future(make_chain(1, 9)),
        PipelineExecutor::execute_future(make_chain(2, 10)),
    );

    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 2);
}
