//! Notification records and dispatch messages

use serde::{Deserialize, Serialize};

/// What happened to the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderCreated,
    StatusChanged,
    BalanceUpdated,
    ProofUploaded,
    ProofReviewed,
}

/// Message handed to the dispatcher after a commit
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    /// Owner uid, or guest email when the order has no owner
    pub recipient: String,
    pub order_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

/// Durable notification record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Assigned by storage
    pub seq: u64,
    pub recipient: String,
    pub order_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub created_at: i64,
    /// Whether the external channel accepted it
    #[serde(default)]
    pub delivered: bool,
}

impl Notification {
    pub fn from_request(req: &NotificationRequest, created_at: i64) -> Self {
        Self {
            seq: 0,
            recipient: req.recipient.clone(),
            order_id: req.order_id.clone(),
            kind: req.kind,
            title: req.title.clone(),
            body: req.body.clone(),
            created_at,
            delivered: false,
        }
    }
}

/// Recipient's opt-in for external delivery (default: off)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub recipient: String,
    pub opt_in_external: bool,
    pub updated_at: i64,
}

/// Where dispatch gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Queue full or worker gone
    Enqueue,
    /// Notification record could not be written
    Persist,
    /// External channel rejected it
    Deliver,
}

/// Dispatcher failure log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchFailure {
    /// Assigned by storage
    pub seq: u64,
    pub stage: FailureStage,
    pub recipient: String,
    pub order_id: String,
    pub kind: NotificationKind,
    pub error: String,
    pub timestamp: i64,
}

impl DispatchFailure {
    pub fn new(stage: FailureStage, req: &NotificationRequest, error: impl Into<String>) -> Self {
        Self {
            seq: 0,
            stage,
            recipient: req.recipient.clone(),
            order_id: req.order_id.clone(),
            kind: req.kind,
            error: error.into(),
            timestamp: shared::util::now_millis(),
        }
    }
}
