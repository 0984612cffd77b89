//! Notification dispatch
//!
//! ```text
//! OrdersManager (after commit)
//!   └─ NotificationDispatcher::notify() → mpsc (bounded) → NotificationWorker
//!        ├─ redb notifications table
//!        └─ DeliveryChannel (only when the recipient opted in)
//! ```
//!
//! Best effort: nothing here can fail or roll back an order operation.

pub mod channel;
pub mod dispatcher;
pub mod types;
pub mod worker;

pub use channel::{DeliveryChannel, DeliveryError, LogDeliveryChannel, WebhookDeliveryChannel};
pub use dispatcher::NotificationDispatcher;
pub use types::{
    DispatchFailure, FailureStage, Notification, NotificationKind, NotificationPreference,
    NotificationRequest,
};
pub use worker::NotificationWorker;
