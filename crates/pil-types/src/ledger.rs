use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::TypeError;
use crate::identity::{ActorId, ConversionId, LedgerEntryId, PartnerId};
use crate::period::BillingPeriod;

/// Kind of ledger row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerType {
    /// The original payout for a period.
    Payout,
    /// A compensating correction against a paid payout.
    Adjustment,
}

/// Lifecycle state of a ledger entry.
///
/// Transitions only move forward:
///
/// ```text
/// DRAFT ──► APPROVED ──► PAID
///   │           │
///   └──► VOID ◄─┘
/// ```
///
/// `PAID` and `VOID` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Draft,
    Approved,
    Paid,
    Void,
}

impl LedgerStatus {
    /// Statuses that count toward the one-live-payout-per-period rule.
    pub const LIVE: [LedgerStatus; 3] = [Self::Draft, Self::Approved, Self::Paid];

    pub fn is_live(&self) -> bool {
        Self::LIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Void)
    }

    pub fn can_transition_to(&self, next: LedgerStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Approved)
                | (Self::Draft, Self::Void)
                | (Self::Approved, Self::Paid)
                | (Self::Approved, Self::Void)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Paid => "PAID",
            Self::Void => "VOID",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partner + period: the scope of the one-live-payout rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageKey {
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
}

impl LineageKey {
    pub fn new(partner_id: PartnerId, period: BillingPeriod) -> Self {
        Self { partner_id, period }
    }
}

impl fmt::Display for LineageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partner_id, self.period)
    }
}

/// An externally attributed conversion. Read-only to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: ConversionId,
    pub partner_id: PartnerId,
    pub link_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cafe_id: Option<String>,
    pub amount: Decimal,
    pub commission: Decimal,
    pub attributed_at: DateTime<Utc>,
}

/// Aggregated money figures of a ledger entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTotals {
    pub total_conversions: u64,
    pub total_revenue: Decimal,
    pub total_commission: Decimal,
}

impl PayoutTotals {
    /// Exact decimal sums over the given records.
    pub fn aggregate<'a>(
        records: impl IntoIterator<Item = &'a ConversionRecord>,
    ) -> Result<Self, TypeError> {
        records
            .into_iter()
            .try_fold(Self::default(), |mut totals, record| {
                totals.total_conversions += 1;
                totals.total_revenue = totals
                    .total_revenue
                    .checked_add(record.amount)
                    .ok_or(TypeError::AmountOverflow { field: "totalRevenue" })?;
                totals.total_commission = totals
                    .total_commission
                    .checked_add(record.commission)
                    .ok_or(TypeError::AmountOverflow { field: "totalCommission" })?;
                Ok(totals)
            })
    }

    /// Totals carried by an adjustment: only the signed commission delta.
    pub fn correction(amount: Decimal) -> Self {
        Self {
            total_conversions: 0,
            total_revenue: Decimal::ZERO,
            total_commission: amount,
        }
    }
}

/// One immutable ledger row.
///
/// After creation only `status` may change, and only along the forward
/// transitions of [`LedgerStatus`]. Corrections are new rows of type
/// [`LedgerType::Adjustment`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLedgerEntry {
    pub id: LedgerEntryId,
    pub partner_id: PartnerId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub ledger_type: LedgerType,
    pub status: LedgerStatus,
    /// Present on payouts only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_hash: Option<Digest>,
    #[serde(default)]
    pub conversion_ids: Vec<ConversionId>,
    #[serde(flatten)]
    pub totals: PayoutTotals,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_ledger_id: Option<LedgerEntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_reason: Option<String>,
    pub approved_by: ActorId,
    pub approved_at: DateTime<Utc>,
}

impl PayoutLedgerEntry {
    pub fn lineage_key(&self) -> LineageKey {
        LineageKey::new(self.partner_id.clone(), self.period)
    }

    /// The payout this entry's version sequence belongs to: the entry itself
    /// for a payout, the referenced payout for an adjustment.
    pub fn lineage_root(&self) -> LedgerEntryId {
        match self.ledger_type {
            LedgerType::Payout => self.id,
            LedgerType::Adjustment => self.reference_ledger_id.unwrap_or(self.id),
        }
    }

    pub fn is_payout(&self) -> bool {
        self.ledger_type == LedgerType::Payout
    }

    /// A payout occupying its period under the one-live-payout rule.
    pub fn is_live_payout(&self) -> bool {
        self.is_payout() && self.status.is_live()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn conversion(id: &str, amount: Decimal, commission: Decimal) -> ConversionRecord {
        ConversionRecord {
            id: ConversionId::new(id).unwrap(),
            partner_id: PartnerId::new("P1").unwrap(),
            link_id: "link-1".into(),
            cafe_id: None,
            amount,
            commission,
            attributed_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn transitions_are_forward_only() {
        use LedgerStatus::*;
        assert!(Draft.can_transition_to(Approved));
        assert!(Draft.can_transition_to(Void));
        assert!(Approved.can_transition_to(Paid));
        assert!(Approved.can_transition_to(Void));
        assert!(!Paid.can_transition_to(Approved));
        assert!(!Paid.can_transition_to(Void));
        assert!(!Void.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Draft));
        assert!(!Approved.can_transition_to(Approved));
    }

    #[test]
    fn live_statuses_exclude_void() {
        assert!(LedgerStatus::Draft.is_live());
        assert!(LedgerStatus::Paid.is_live());
        assert!(!LedgerStatus::Void.is_live());
    }

    #[test]
    fn aggregate_uses_exact_decimals() {
        let records = vec![
            conversion("c1", dec!(0.10), dec!(0.01)),
            conversion("c2", dec!(0.20), dec!(0.02)),
            conversion("c3", dec!(0.30), dec!(0.03)),
        ];
        let totals = PayoutTotals::aggregate(&records).unwrap();
        assert_eq!(totals.total_conversions, 3);
        assert_eq!(totals.total_revenue, dec!(0.60));
        assert_eq!(totals.total_commission, dec!(0.06));
    }

    #[test]
    fn aggregate_reports_overflow() {
        let records = vec![
            conversion("c1", Decimal::MAX, dec!(1)),
            conversion("c2", dec!(1), dec!(1)),
        ];
        assert_eq!(
            PayoutTotals::aggregate(&records),
            Err(TypeError::AmountOverflow { field: "totalRevenue" })
        );
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        let none: Vec<ConversionRecord> = Vec::new();
        let totals = PayoutTotals::aggregate(&none).unwrap();
        assert_eq!(totals, PayoutTotals::default());
    }

    #[test]
    fn status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&LedgerStatus::Approved).unwrap(),
            "\"APPROVED\""
        );
        assert_eq!(
            serde_json::to_string(&LedgerType::Adjustment).unwrap(),
            "\"ADJUSTMENT\""
        );
    }

    #[test]
    fn entry_json_uses_flat_camel_case_fields() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
        let entry = PayoutLedgerEntry {
            id: LedgerEntryId::new(),
            partner_id: PartnerId::new("P1").unwrap(),
            period: BillingPeriod::new(start, end).unwrap(),
            ledger_type: LedgerType::Payout,
            status: LedgerStatus::Approved,
            snapshot_hash: Some(Digest::from_bytes([3; 32])),
            conversion_ids: vec![ConversionId::new("c1").unwrap()],
            totals: PayoutTotals::aggregate(&[conversion("c1", dec!(10), dec!(1))]).unwrap(),
            version: 1,
            reference_ledger_id: None,
            adjustment_reason: None,
            approved_by: ActorId::new("admin").unwrap(),
            approved_at: end,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["periodStart"], "2024-03-01T00:00:00Z");
        assert_eq!(value["ledgerType"], "PAYOUT");
        assert_eq!(value["totalConversions"], 1);
        assert_eq!(value["totalCommission"], "1");
        assert!(value.get("referenceLedgerId").is_none());

        let back: PayoutLedgerEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
        assert_eq!(back.lineage_root(), entry.id);
        assert!(back.is_live_payout());
    }
}
