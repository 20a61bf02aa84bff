//! Notification dispatch: multi-consumer fan-out under ordering phases and
//! error strategies.

pub mod dispatcher;
pub mod strategy;
pub mod traits;

// Re-exports
pub use dispatcher::NotificationDispatcher;
pub use strategy::DispatchStrategy;
pub use traits::{Notification, NotificationHandler};
