use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pil_types::{LedgerEntryId, LedgerStatus, PayoutLedgerEntry};

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};

/// Net payable position of one payout lineage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageSummary {
    pub payout_id: LedgerEntryId,
    pub gross_commission: Decimal,
    pub adjustments_total: Decimal,
    pub net_commission: Decimal,
    pub latest_version: u32,
    pub adjustment_count: usize,
}

impl LineageSummary {
    /// Fold a payout and its adjustments, in version order, skipping VOID
    /// entries and anything outside the lineage.
    pub fn replay(payout_id: LedgerEntryId, entries: &[PayoutLedgerEntry]) -> Self {
        let mut lineage: Vec<&PayoutLedgerEntry> = entries
            .iter()
            .filter(|e| e.lineage_root() == payout_id && e.status != LedgerStatus::Void)
            .collect();
        lineage.sort_by_key(|e| e.version);

        let mut summary = Self {
            payout_id,
            gross_commission: Decimal::ZERO,
            adjustments_total: Decimal::ZERO,
            net_commission: Decimal::ZERO,
            latest_version: 0,
            adjustment_count: 0,
        };
        for entry in lineage {
            if entry.is_payout() {
                summary.gross_commission += entry.totals.total_commission;
            } else {
                summary.adjustments_total += entry.totals.total_commission;
                summary.adjustment_count += 1;
            }
            summary.latest_version = entry.version;
        }
        summary.net_commission = summary.gross_commission + summary.adjustments_total;
        summary
    }
}

/// Builds [`LineageSummary`] views from the store.
pub struct LineageProjection {
    ctx: LedgerContext,
}

impl LineageProjection {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Summary of the lineage `id` belongs to; `id` may name the payout or
    /// any of its adjustments.
    pub async fn summary(&self, id: &LedgerEntryId) -> LedgerResult<LineageSummary> {
        let entry = self
            .ctx
            .store
            .entry(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("entry {id}")))?;
        let entries = self.ctx.store.entries_for(&entry.lineage_key()).await?;
        Ok(LineageSummary::replay(entry.lineage_root(), &entries))
    }
}
