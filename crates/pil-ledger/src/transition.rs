use tracing::info;

use pil_types::{ActorId, LedgerEntryId, LedgerStatus, PayoutLedgerEntry, StatusEvent};

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};
use crate::events::publish_best_effort;
use crate::traits::{IsolationLevel, StoreError};

/// Moves entries along `DRAFT -> APPROVED -> PAID`, or to `VOID` before
/// payment. Status is the only field of a stored entry that ever changes.
pub struct StatusTransitions {
    ctx: LedgerContext,
}

impl StatusTransitions {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn transition(
        &self,
        entry_id: &LedgerEntryId,
        to: LedgerStatus,
        actor: &ActorId,
    ) -> LedgerResult<PayoutLedgerEntry> {
        let (entry, from) = self
            .ctx
            .within_deadline("transition", self.write(entry_id, to))
            .await?;

        publish_best_effort(
            self.ctx.events.as_ref(),
            StatusEvent::new(entry.id, entry.status, self.ctx.clock.now()),
        );
        info!(entry = %entry.id, %from, to = %entry.status, %actor, "status changed");
        Ok(entry)
    }

    async fn write(
        &self,
        entry_id: &LedgerEntryId,
        to: LedgerStatus,
    ) -> LedgerResult<(PayoutLedgerEntry, LedgerStatus)> {
        let mut tx = self.ctx.store.begin(IsolationLevel::Serializable).await?;

        let mut entry = tx
            .entry(entry_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("entry {entry_id}")))?;
        let from = entry.status;
        if !from.can_transition_to(to) {
            return Err(LedgerError::InvalidState(format!(
                "entry {entry_id} cannot move from {from} to {to}"
            )));
        }

        tx.update_status(entry_id, to).await.map_err(|err| match err {
            StoreError::UniqueViolation(detail) => LedgerError::Conflict(detail),
            other => other.into(),
        })?;
        tx.commit().await?;

        entry.status = to;
        Ok((entry, from))
    }
}

#[cfg(test)]
mod tests {
    use pil_types::ErrorCode;

    use super::*;
    use crate::approval::{ApprovalRequest, PayoutApprovalTransaction};
    use crate::testing::{approver, march, partner, Harness};

    async fn approved(harness: &Harness) -> PayoutLedgerEntry {
        PayoutApprovalTransaction::new(harness.ctx.clone())
            .approve(ApprovalRequest {
                partner_id: partner(),
                period: march(),
                snapshot_hash: harness.ctx.hasher.hash(&[]),
                conversion_ids: Vec::new(),
                approver_id: approver(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn approved_payout_can_be_paid() {
        let harness = Harness::new().await;
        let payout = approved(&harness).await;
        let transitions = StatusTransitions::new(harness.ctx.clone());
        harness.clock.advance(chrono::Duration::hours(6));

        let paid = transitions
            .transition(&payout.id, LedgerStatus::Paid, &approver())
            .await
            .unwrap();

        assert_eq!(paid.status, LedgerStatus::Paid);
        assert_eq!(paid.version, payout.version);
        let events = harness.sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].message.status, LedgerStatus::Paid);
        assert_eq!(
            events[1].message.timestamp,
            crate::testing::now() + chrono::Duration::hours(6)
        );
        assert_eq!(paid.approved_at, payout.approved_at);
    }

    #[tokio::test]
    async fn paid_is_terminal() {
        let harness = Harness::new().await;
        let payout = approved(&harness).await;
        let transitions = StatusTransitions::new(harness.ctx.clone());
        transitions
            .transition(&payout.id, LedgerStatus::Paid, &approver())
            .await
            .unwrap();

        for to in [LedgerStatus::Void, LedgerStatus::Approved, LedgerStatus::Draft] {
            let err = transitions
                .transition(&payout.id, to, &approver())
                .await
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidState);
        }
    }

    #[tokio::test]
    async fn void_releases_the_period() {
        let harness = Harness::new().await;
        let payout = approved(&harness).await;
        StatusTransitions::new(harness.ctx.clone())
            .transition(&payout.id, LedgerStatus::Void, &approver())
            .await
            .unwrap();

        let replacement = approved(&harness).await;
        assert_ne!(replacement.id, payout.id);
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let harness = Harness::new().await;
        let err = StatusTransitions::new(harness.ctx.clone())
            .transition(&LedgerEntryId::new(), LedgerStatus::Paid, &approver())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
