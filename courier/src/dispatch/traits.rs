//! Capability contracts consumed by the notification dispatcher.

use async_trait::async_trait;

use crate::error::BoxError;

/// An event object broadcast to zero or more handlers.
///
/// No response value flows back to the publisher; handlers receive only the
/// immutable notification, never a pipeline context.
pub trait Notification: Send + Sync + 'static {}

/// Handler invoked for one notification delivery.
///
/// A fresh instance is built from the registration's factory for every
/// dispatch attempt.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    /// Process the notification.
    async fn handle(&self, notification: &N) -> Result<(), BoxError>;

    /// Component name used in dispatch logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
