//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific order operation.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};

mod add_payment;
mod create_order;
mod review_proof;
mod set_status;
mod upload_proof;

pub use add_payment::AddPaymentAction;
pub use create_order::CreateOrderAction;
pub use review_proof::{ReviewProofAction, RevertProofReviewAction};
pub use set_status::SetStatusAction;
pub use upload_proof::{MAX_PROOFS_PER_ORDER, UploadProofAction};

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    SetStatus(SetStatusAction),
    AddPayment(AddPaymentAction),
    UploadProof(UploadProofAction),
    ReviewProof(ReviewProofAction),
    RevertProofReview(RevertProofReviewAction),
}

impl CommandAction {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            CommandAction::CreateOrder(_) => "create_order",
            CommandAction::SetStatus(_) => "set_status",
            CommandAction::AddPayment(_) => "add_payment",
            CommandAction::UploadProof(_) => "upload_proof",
            CommandAction::ReviewProof(_) => "review_proof",
            CommandAction::RevertProofReview(_) => "revert_proof_review",
        }
    }
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    fn validate(&self) -> Result<(), OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.validate(),
            CommandAction::SetStatus(action) => action.validate(),
            CommandAction::AddPayment(action) => action.validate(),
            CommandAction::UploadProof(action) => action.validate(),
            CommandAction::ReviewProof(action) => action.validate(),
            CommandAction::RevertProofReview(action) => action.validate(),
        }
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::SetStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::AddPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::UploadProof(action) => action.execute(ctx, metadata).await,
            CommandAction::ReviewProof(action) => action.execute(ctx, metadata).await,
            CommandAction::RevertProofReview(action) => action.execute(ctx, metadata).await,
        }
    }
}

impl From<CreateOrderAction> for CommandAction {
    fn from(action: CreateOrderAction) -> Self {
        CommandAction::CreateOrder(action)
    }
}

impl From<SetStatusAction> for CommandAction {
    fn from(action: SetStatusAction) -> Self {
        CommandAction::SetStatus(action)
    }
}

impl From<AddPaymentAction> for CommandAction {
    fn from(action: AddPaymentAction) -> Self {
        CommandAction::AddPayment(action)
    }
}

impl From<UploadProofAction> for CommandAction {
    fn from(action: UploadProofAction) -> Self {
        CommandAction::UploadProof(action)
    }
}

impl From<ReviewProofAction> for CommandAction {
    fn from(action: ReviewProofAction) -> Self {
        CommandAction::ReviewProof(action)
    }
}

impl From<RevertProofReviewAction> for CommandAction {
    fn from(action: RevertProofReviewAction) -> Self {
        CommandAction::RevertProofReview(action)
    }
}
