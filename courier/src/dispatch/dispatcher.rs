//! Three-phase notification delivery.
//!
//! # Architecture
//!
//! One dispatch partitions the registrations for a notification type into
//! three buckets by comparing their order to the phase sentinels, then runs
//! the buckets as strict barriers:
//!
//! ```text
//! ┌─ earlyParallel ─────┐   ┌─ sequential ──────┐   ┌─ lateParallel ──────┐
//! │  H1 ──┐             │   │                   │   │  H5 ──┐             │
//! │  H2 ──┼── join all  │ → │  H3 → H4 (by ord) │ → │  H6 ──┼── join all  │
//! │  H3 ──┘             │   │                   │   │  H7 ──┘             │
//! └─────────────────────┘   └───────────────────┘   └─────────────────────┘
//! ```
//!
//! No phase starts before the previous one fully finished, and a member's
//! failure never terminates its phase early: every handler across all phases
//! is attempted exactly once, regardless of earlier failures. This
//! collect-then-decide behavior is deliberate (all handlers are guaranteed to
//! run, so their side effects happen); do not "optimize" it into fail-fast.
//!
//! Within a parallel bucket no ordering is guaranteed between siblings; each
//! attempt settles to its own outcome before the join, so one failure cannot
//! abort the barrier.
//!
//! # Known limitation
//!
//! There is no cancellation or timeout: a handler that never completes
//! blocks its phase (and the whole dispatch) indefinitely.

use futures::future::join_all;

use crate::dispatch::strategy::DispatchStrategy;
use crate::dispatch::traits::Notification;
use crate::error::{AggregateError, BoxError, ConfigurationError};
use crate::id::CorrelationId;
use crate::registration::{NotificationRegistration, Phase};

/// Delivers one notification to every registered handler for its type,
/// honoring ordering phases and an error-handling strategy.
#[derive(Debug, Default)]
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Dispatch `notification` to all `registrations`.
    ///
    /// The registrations must be pre-sorted ascending by order with a stable
    /// sort (ties keep registration sequence); the sequential phase relies
    /// on it.
    ///
    /// # Errors
    ///
    /// Only under [`DispatchStrategy::CollectErrors`], and only when at
    /// least one attempt failed: an [`AggregateError`] carrying every
    /// failure in attempt order. Under
    /// [`DispatchStrategy::ContinueOnError`] the dispatch always completes
    /// successfully.
    pub async fn dispatch<N: Notification>(
        notification: &N,
        registrations: &[NotificationRegistration<N>],
        correlation_id: CorrelationId,
        strategy: DispatchStrategy,
    ) -> Result<(), AggregateError> {
        if registrations.is_empty() {
            return Ok(());
        }
        debug_assert!(
            registrations.windows(2).all(|w| w[0].order() <= w[1].order()),
            "notification registrations must be pre-sorted ascending by order"
        );

        let mut early = Vec::new();
        let mut sequential = Vec::new();
        let mut late = Vec::new();
        for registration in registrations {
            match registration.order().phase() {
                Phase::EarlyParallel => early.push(registration),
                Phase::Sequential => sequential.push(registration),
                Phase::LateParallel => late.push(registration),
            }
        }
        tracing::debug!(
            %correlation_id,
            notification_type = std::any::type_name::<N>(),
            early = early.len(),
            sequential = sequential.len(),
            late = late.len(),
            "dispatching notification"
        );

        let mut errors: Vec<BoxError> = Vec::new();

        run_parallel(notification, &early, correlation_id, strategy, &mut errors).await;
        for registration in &sequential {
            let outcome = attempt(notification, registration).await;
            record(outcome, registration, correlation_id, strategy, &mut errors);
        }
        run_parallel(notification, &late, correlation_id, strategy, &mut errors).await;

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError { errors })
        }
    }
}

/// Run one parallel bucket as a barrier.
///
/// Every attempt settles to its own `Result` before the join, so a failing
/// sibling cannot abort the batch; outcomes are then recorded in
/// registration order.
async fn run_parallel<N: Notification>(
    notification: &N,
    bucket: &[&NotificationRegistration<N>],
    correlation_id: CorrelationId,
    strategy: DispatchStrategy,
    errors: &mut Vec<BoxError>,
) {
    if bucket.is_empty() {
        return;
    }
    let outcomes = join_all(
        bucket
            .iter()
            .map(|registration| attempt(notification, registration)),
    )
    .await;
    for (outcome, registration) in outcomes.into_iter().zip(bucket) {
        record(outcome, registration, correlation_id, strategy, errors);
    }
}

/// One handler attempt: build the handler, then invoke it.
///
/// A factory failure counts as an attempt failure, reported as a
/// [`ConfigurationError`] naming the registration.
async fn attempt<N: Notification>(
    notification: &N,
    registration: &NotificationRegistration<N>,
) -> Result<(), BoxError> {
    let handler = registration.build().map_err(|source| {
        Box::new(ConfigurationError::new(registration.description(), source)) as BoxError
    })?;
    handler.handle(notification).await
}

fn record<N: Notification>(
    outcome: Result<(), BoxError>,
    registration: &NotificationRegistration<N>,
    correlation_id: CorrelationId,
    strategy: DispatchStrategy,
    errors: &mut Vec<BoxError>,
) {
    let Err(err) = outcome else {
        return;
    };
    match strategy {
        DispatchStrategy::ContinueOnError => {
            tracing::warn!(
                %correlation_id,
                registration = registration.description(),
                error = %err,
                "notification handler failed; continuing"
            );
        }
        DispatchStrategy::CollectErrors => {
            errors.push(err);
        }
    }
}
