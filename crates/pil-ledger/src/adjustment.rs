use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use pil_types::{
    ActorId, LedgerEntryId, LedgerStatus, LedgerType, PayoutLedgerEntry, PayoutTotals,
    StatusEvent,
};

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};
use crate::events::publish_best_effort;
use crate::traits::{IsolationLevel, StoreError};

/// A signed correction against a paid payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    pub payout_id: LedgerEntryId,
    pub adjustment_amount: Decimal,
    pub reason: String,
    pub approver_id: ActorId,
}

/// Appends correction entries to a payout's lineage.
///
/// Each adjustment takes the next version after the highest one in the
/// lineage, so the lineage's versions are strictly increasing in creation
/// order. The payout itself is never modified.
pub struct AdjustmentLedgerWriter {
    ctx: LedgerContext,
}

impl AdjustmentLedgerWriter {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn create_adjustment(
        &self,
        request: AdjustmentRequest,
    ) -> LedgerResult<PayoutLedgerEntry> {
        let entry = self
            .ctx
            .within_deadline("adjust", self.write(&request))
            .await?;

        publish_best_effort(
            self.ctx.events.as_ref(),
            StatusEvent::new(entry.id, entry.status, entry.approved_at),
        );
        info!(
            entry = %entry.id,
            payout = %request.payout_id,
            version = entry.version,
            amount = %request.adjustment_amount,
            approver = %entry.approved_by,
            "adjustment recorded"
        );
        Ok(entry)
    }

    /// Checks run in a fixed order: the referenced payout must exist, then
    /// be PAID, and only then are the request's own fields validated.
    async fn write(&self, request: &AdjustmentRequest) -> LedgerResult<PayoutLedgerEntry> {
        let mut tx = self.ctx.store.begin(IsolationLevel::Serializable).await?;

        let payout = tx
            .entry(&request.payout_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("payout {}", request.payout_id)))?;
        if !payout.is_payout() {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is an adjustment; adjustments reference payouts",
                payout.id
            )));
        }
        if payout.status != LedgerStatus::Paid {
            return Err(LedgerError::InvalidState(format!(
                "payout {} is {}; only paid payouts may be adjusted",
                payout.id, payout.status
            )));
        }

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::InvalidArgument(
                "adjustment reason must not be blank".into(),
            ));
        }
        if request.adjustment_amount.is_zero() {
            return Err(LedgerError::InvalidArgument(
                "adjustment amount must be non-zero".into(),
            ));
        }

        let latest = tx
            .max_lineage_version(&payout.id)
            .await?
            .unwrap_or(payout.version);
        let version = latest.checked_add(1).ok_or_else(|| {
            LedgerError::Internal(format!("lineage {} exhausted its versions", payout.id))
        })?;

        let entry = PayoutLedgerEntry {
            id: LedgerEntryId::new(),
            partner_id: payout.partner_id.clone(),
            period: payout.period,
            ledger_type: LedgerType::Adjustment,
            status: LedgerStatus::Approved,
            snapshot_hash: None,
            conversion_ids: Vec::new(),
            totals: PayoutTotals::correction(request.adjustment_amount),
            version,
            reference_ledger_id: Some(payout.id),
            adjustment_reason: Some(reason.to_string()),
            approved_by: request.approver_id.clone(),
            approved_at: self.ctx.clock.now(),
        };

        tx.insert_entry(entry.clone()).await.map_err(|err| match err {
            StoreError::UniqueViolation(detail) => LedgerError::Conflict(format!(
                "lineage {} moved on while adjusting: {detail}",
                payout.id
            )),
            other => other.into(),
        })?;
        tx.commit().await?;
        Ok(entry)
    }
}
