use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use pil_types::{
    ActorId, BillingPeriod, ConversionId, Digest, LedgerEntryId, LedgerStatus, LedgerType,
    LineageKey, PartnerId, PayoutLedgerEntry, PayoutTotals, StatusEvent,
};

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};
use crate::events::publish_best_effort;
use crate::traits::IsolationLevel;

/// An approver's request to lock in a previewed payout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub snapshot_hash: Digest,
    pub conversion_ids: Vec<ConversionId>,
    pub approver_id: ActorId,
}

/// Converts an approved preview into an immutable APPROVED payout entry.
///
/// The supplied snapshot hash is checked against the supplied conversion ids
/// before anything is written. The live-payout check, the conversion
/// re-fetch, and the insert then run in one SERIALIZABLE transaction, so two
/// concurrent approvals for the same period can never both succeed.
pub struct PayoutApprovalTransaction {
    ctx: LedgerContext,
}

impl PayoutApprovalTransaction {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    pub async fn approve(&self, request: ApprovalRequest) -> LedgerResult<PayoutLedgerEntry> {
        reject_duplicates(&request.conversion_ids)?;

        let recomputed = self.ctx.hasher.hash(&request.conversion_ids);
        if recomputed != request.snapshot_hash {
            error!(
                target: "pil::security",
                partner = %request.partner_id,
                period = %request.period,
                approver = %request.approver_id,
                supplied = %request.snapshot_hash,
                recomputed = %recomputed,
                "snapshot hash mismatch on approval"
            );
            return Err(LedgerError::IntegrityViolation(format!(
                "snapshot hash {} does not match the supplied conversions",
                request.snapshot_hash.short_hex()
            )));
        }

        let entry = self
            .ctx
            .within_deadline("approve", self.write(&request))
            .await?;

        publish_best_effort(
            self.ctx.events.as_ref(),
            StatusEvent::new(entry.id, entry.status, entry.approved_at),
        );
        info!(
            entry = %entry.id,
            partner = %entry.partner_id,
            period = %entry.period,
            conversions = entry.totals.total_conversions,
            commission = %entry.totals.total_commission,
            approver = %entry.approved_by,
            "payout approved"
        );
        Ok(entry)
    }

    async fn write(&self, request: &ApprovalRequest) -> LedgerResult<PayoutLedgerEntry> {
        let mut tx = self.ctx.store.begin(IsolationLevel::Serializable).await?;

        if !tx.partner_exists(&request.partner_id).await? {
            return Err(LedgerError::NotFound(format!(
                "partner {}",
                request.partner_id
            )));
        }

        let key = LineageKey::new(request.partner_id.clone(), request.period);
        if let Some(existing) = tx.live_payout(&key).await? {
            return Err(LedgerError::Conflict(format!(
                "payout {} is already {} for {key}",
                existing.id, existing.status
            )));
        }

        let records = tx.conversions_by_ids(&request.conversion_ids).await?;
        if records.len() != request.conversion_ids.len() {
            let found: HashSet<&ConversionId> = records.iter().map(|r| &r.id).collect();
            let missing: Vec<&str> = request
                .conversion_ids
                .iter()
                .filter(|id| !found.contains(id))
                .map(|id| id.as_str())
                .collect();
            return Err(LedgerError::NotFound(format!(
                "conversions {}",
                missing.join(", ")
            )));
        }
        if let Some(foreign) = records.iter().find(|r| r.partner_id != request.partner_id) {
            return Err(LedgerError::InvalidArgument(format!(
                "conversion {} belongs to partner {}",
                foreign.id, foreign.partner_id
            )));
        }

        let entry = PayoutLedgerEntry {
            id: LedgerEntryId::new(),
            partner_id: request.partner_id.clone(),
            period: request.period,
            ledger_type: LedgerType::Payout,
            status: LedgerStatus::Approved,
            snapshot_hash: Some(request.snapshot_hash),
            conversion_ids: request.conversion_ids.clone(),
            totals: PayoutTotals::aggregate(&records)?,
            version: 1,
            reference_ledger_id: None,
            adjustment_reason: None,
            approved_by: request.approver_id.clone(),
            approved_at: self.ctx.clock.now(),
        };

        tx.insert_entry(entry.clone()).await?;
        tx.commit().await?;
        Ok(entry)
    }
}

fn reject_duplicates(ids: &[ConversionId]) -> LedgerResult<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    match ids.iter().find(|id| !seen.insert(*id)) {
        Some(dup) => Err(LedgerError::InvalidArgument(format!(
            "conversion {dup} listed more than once"
        ))),
        None => Ok(()),
    }
}
