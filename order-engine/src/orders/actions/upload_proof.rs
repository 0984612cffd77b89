//! UploadProof command handler
//!
//! Appends a `pending_review` proof. The file itself lives in blob storage;
//! only its URL is kept. The first pending proof on a `pending` order moves it
//! to `payment_review`.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use shared::error::ErrorCode;
use shared::order::{OrderStatus, PaymentProof, ProofStatus};

/// Maximum number of proofs one order can carry
pub const MAX_PROOFS_PER_ORDER: usize = 10;

/// UploadProof action
#[derive(Debug, Clone)]
pub struct UploadProofAction {
    pub order_id: String,
    /// Server-assigned proof ID
    pub proof_id: String,
    pub url: String,
    pub proof_type: String,
    /// Admins may upload on behalf of the owner
    pub is_admin: bool,
}

#[async_trait]
impl CommandHandler for UploadProofAction {
    fn validate(&self) -> Result<(), OrderError> {
        if self.url.trim().is_empty() {
            return Err(OrderError::validation(
                ErrorCode::RequiredField,
                "proof url is required",
            ));
        }
        if self.proof_type.trim().is_empty() {
            return Err(OrderError::validation(
                ErrorCode::RequiredField,
                "proof type is required",
            ));
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let mut order = ctx.load_order(&self.order_id)?;

        if !self.is_admin && !order.is_owned_by(&metadata.actor_id) {
            // 不泄露订单存在性
            return Err(OrderError::OrderNotFound(self.order_id.clone()));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::OrderCancelled(self.order_id.clone()));
        }
        if order.proofs.len() >= MAX_PROOFS_PER_ORDER {
            return Err(OrderError::ProofLimitReached(MAX_PROOFS_PER_ORDER));
        }

        let had_pending = order
            .proofs
            .iter()
            .any(|p| p.status == ProofStatus::PendingReview);

        order.proofs.push(PaymentProof {
            id: self.proof_id.clone(),
            url: self.url.trim().to_string(),
            proof_type: self.proof_type.trim().to_string(),
            status: ProofStatus::PendingReview,
            uploaded_by: metadata.actor_id.clone(),
            uploaded_at: metadata.timestamp,
            reviewed_by: None,
            reviewed_at: None,
        });

        let moved_to_review = order.status == OrderStatus::Pending && !had_pending;
        if moved_to_review {
            order.status = OrderStatus::PaymentReview;
        }
        order.updated_at = metadata.timestamp;
        order.updated_by = Some(metadata.actor_id.clone());
        ctx.save_order(order);

        Ok(vec![OrderChange::ProofUploaded {
            order_id: self.order_id.clone(),
            proof_id: self.proof_id.clone(),
            moved_to_review,
        }])
    }
}
