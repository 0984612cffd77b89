//! ReviewProof / RevertProofReview command handlers
//!
//! Review only rewrites the proof entry. Crediting the ledger is a separate
//! AddPayment transaction driven by the manager; if that fails the manager
//! runs [`RevertProofReviewAction`] to put the proof back to its previous
//! status.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderChange, OrderError};
use shared::order::{ProofDecision, ProofStatus};

/// ReviewProof action
#[derive(Debug, Clone)]
pub struct ReviewProofAction {
    pub order_id: String,
    pub proof_id: String,
    pub decision: ProofDecision,
}

#[async_trait]
impl CommandHandler for ReviewProofAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let mut order = ctx.load_order(&self.order_id)?;

        let proof = order
            .proofs
            .iter_mut()
            .find(|p| p.id == self.proof_id)
            .ok_or_else(|| OrderError::ProofNotFound(self.proof_id.clone()))?;

        if proof.status != ProofStatus::PendingReview {
            return Err(OrderError::ProofAlreadyReviewed(self.proof_id.clone()));
        }

        let status = ProofStatus::from(self.decision);
        proof.status = status;
        proof.reviewed_by = Some(metadata.actor_id.clone());
        proof.reviewed_at = Some(metadata.timestamp);

        order.updated_at = metadata.timestamp;
        order.updated_by = Some(metadata.actor_id.clone());
        ctx.save_order(order);

        Ok(vec![OrderChange::ProofReviewed {
            order_id: self.order_id.clone(),
            proof_id: self.proof_id.clone(),
            status,
        }])
    }
}

/// Compensating write: restore a proof's pre-review status
#[derive(Debug, Clone)]
pub struct RevertProofReviewAction {
    pub order_id: String,
    pub proof_id: String,
    pub previous: ProofStatus,
}

#[async_trait]
impl CommandHandler for RevertProofReviewAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderChange>, OrderError> {
        let mut order = ctx.load_order(&self.order_id)?;

        let proof = order
            .proofs
            .iter_mut()
            .find(|p| p.id == self.proof_id)
            .ok_or_else(|| OrderError::ProofNotFound(self.proof_id.clone()))?;

        proof.status = self.previous;
        proof.reviewed_by = None;
        proof.reviewed_at = None;

        order.updated_at = metadata.timestamp;
        ctx.save_order(order);

        Ok(vec![OrderChange::ProofReviewReverted {
            order_id: self.order_id.clone(),
            proof_id: self.proof_id.clone(),
        }])
    }
}
