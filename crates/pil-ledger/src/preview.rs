use serde::{Deserialize, Serialize};
use tracing::debug;

use pil_types::{BillingPeriod, ConversionId, Digest, PartnerId, PayoutTotals};

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};

/// Proposed payout for a partner's period. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutPreview {
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub conversion_ids: Vec<ConversionId>,
    #[serde(flatten)]
    pub totals: PayoutTotals,
    pub snapshot_hash: Digest,
}

/// Read-only aggregation of a period's conversions into a proposed payout.
pub struct PayoutPreviewComputer {
    ctx: LedgerContext,
}

impl PayoutPreviewComputer {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Deterministic for a fixed underlying data set. A period with no
    /// conversions yields zero totals and the digest of the empty sequence.
    pub async fn preview(
        &self,
        partner_id: &PartnerId,
        period: &BillingPeriod,
    ) -> LedgerResult<PayoutPreview> {
        if !self.ctx.conversions.partner_exists(partner_id).await? {
            return Err(LedgerError::NotFound(format!("partner {partner_id}")));
        }

        let records = self
            .ctx
            .conversions
            .conversions_in_period(partner_id, period)
            .await?;
        let conversion_ids: Vec<ConversionId> = records.iter().map(|r| r.id.clone()).collect();
        let totals = PayoutTotals::aggregate(&records)?;
        let snapshot_hash = self.ctx.hasher.hash(&conversion_ids);

        debug!(
            partner = %partner_id,
            period = %period,
            conversions = totals.total_conversions,
            snapshot = %snapshot_hash.short_hex(),
            "payout preview computed"
        );

        Ok(PayoutPreview {
            partner_id: partner_id.clone(),
            period: *period,
            conversion_ids,
            totals,
            snapshot_hash,
        })
    }
}
