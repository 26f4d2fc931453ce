use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use pil_crypto::SnapshotHasher;
use pil_types::{
    BillingPeriod, LedgerEntryId, LedgerStatus, LineageKey, PartnerId, PayoutLedgerEntry,
};
use rust_decimal::Decimal;

use crate::context::LedgerContext;
use crate::error::{LedgerError, LedgerResult};

/// Outcome of re-verifying persisted ledger data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub lineage: LineageKey,
    pub entry_count: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub entry_id: LedgerEntryId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    SnapshotMismatch,
    DuplicateLivePayout,
    DuplicateVersion,
    NonMonotonicVersion,
    DanglingReference,
    ReferenceNotPaid,
    MalformedAdjustment,
}

/// Read-time verifier for stored payouts and their lineages.
///
/// Collects every violation instead of stopping at the first one.
pub struct LedgerAuditor {
    ctx: LedgerContext,
}

impl LedgerAuditor {
    pub fn new(ctx: LedgerContext) -> Self {
        Self { ctx }
    }

    /// Audit one entry in isolation: a payout's snapshot hash, or an
    /// adjustment's shape and reference.
    pub async fn audit_entry(&self, id: &LedgerEntryId) -> LedgerResult<AuditReport> {
        let entry = self
            .ctx
            .store
            .entry(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("entry {id}")))?;

        let mut related = vec![entry.clone()];
        if let Some(reference) = entry.reference_ledger_id {
            if let Some(payout) = self.ctx.store.entry(&reference).await? {
                related.push(payout);
            }
        }

        let mut violations = Vec::new();
        check_entry(&self.ctx.hasher, &entry, &index(&related), &mut violations);
        Ok(self.report(entry.lineage_key(), 1, violations))
    }

    /// Audit every payout and adjustment recorded for a partner's period.
    pub async fn audit_lineage(
        &self,
        partner_id: &PartnerId,
        period: &BillingPeriod,
    ) -> LedgerResult<AuditReport> {
        let key = LineageKey::new(partner_id.clone(), *period);
        let entries = self.ctx.store.entries_for(&key).await?;
        let violations = inspect(&self.ctx.hasher, &entries);
        Ok(self.report(key, entries.len(), violations))
    }

    fn report(&self, lineage: LineageKey, entry_count: usize, violations: Vec<Violation>) -> AuditReport {
        if violations.is_empty() {
            debug!(%lineage, entry_count, "ledger audit clean");
        } else {
            for violation in &violations {
                error!(
                    target: "pil::security",
                    %lineage,
                    entry = %violation.entry_id,
                    kind = ?violation.kind,
                    "{}",
                    violation.description
                );
            }
        }
        AuditReport {
            lineage,
            entry_count,
            violations,
        }
    }
}

/// Check a lineage's entries, given in creation order.
pub fn inspect(hasher: &SnapshotHasher, entries: &[PayoutLedgerEntry]) -> Vec<Violation> {
    let by_id = index(entries);
    let mut violations = Vec::new();

    for entry in entries {
        check_entry(hasher, entry, &by_id, &mut violations);
    }

    let mut live = entries.iter().filter(|e| e.is_live_payout());
    if let Some(first) = live.next() {
        for extra in live {
            violations.push(Violation {
                entry_id: extra.id,
                kind: ViolationKind::DuplicateLivePayout,
                description: format!("payout {} is already live for the period", first.id),
            });
        }
    }

    let mut seen: HashSet<(LedgerEntryId, u32)> = HashSet::new();
    let mut latest: HashMap<LedgerEntryId, u32> = HashMap::new();
    for entry in entries {
        let root = entry.lineage_root();
        if !seen.insert((root, entry.version)) {
            violations.push(Violation {
                entry_id: entry.id,
                kind: ViolationKind::DuplicateVersion,
                description: format!("version {} repeats in lineage {root}", entry.version),
            });
            continue;
        }
        if let Some(previous) = latest.get(&root) {
            if entry.version <= *previous {
                violations.push(Violation {
                    entry_id: entry.id,
                    kind: ViolationKind::NonMonotonicVersion,
                    description: format!(
                        "version {} follows version {previous} in lineage {root}",
                        entry.version
                    ),
                });
            }
        }
        let slot = latest.entry(root).or_insert(entry.version);
        *slot = (*slot).max(entry.version);
    }

    violations
}

fn index(entries: &[PayoutLedgerEntry]) -> HashMap<LedgerEntryId, &PayoutLedgerEntry> {
    entries.iter().map(|e| (e.id, e)).collect()
}

fn check_entry(
    hasher: &SnapshotHasher,
    entry: &PayoutLedgerEntry,
    by_id: &HashMap<LedgerEntryId, &PayoutLedgerEntry>,
    violations: &mut Vec<Violation>,
) {
    if entry.is_payout() {
        let intact = entry
            .snapshot_hash
            .as_ref()
            .is_some_and(|stored| hasher.verify(&entry.conversion_ids, stored));
        if !intact {
            violations.push(Violation {
                entry_id: entry.id,
                kind: ViolationKind::SnapshotMismatch,
                description: "stored snapshot hash does not cover the stored conversions".into(),
            });
        }
        return;
    }

    let reason_missing = entry
        .adjustment_reason
        .as_deref()
        .map_or(true, |r| r.trim().is_empty());
    if entry.totals.total_conversions != 0
        || entry.totals.total_revenue != Decimal::ZERO
        || !entry.conversion_ids.is_empty()
        || reason_missing
    {
        violations.push(Violation {
            entry_id: entry.id,
            kind: ViolationKind::MalformedAdjustment,
            description: "adjustments carry only a commission delta and a reason".into(),
        });
    }

    match entry.reference_ledger_id.and_then(|id| by_id.get(&id)) {
        Some(payout) if !payout.is_payout() => violations.push(Violation {
            entry_id: entry.id,
            kind: ViolationKind::DanglingReference,
            description: format!("referenced entry {} is not a payout", payout.id),
        }),
        Some(payout) if payout.status != LedgerStatus::Paid => violations.push(Violation {
            entry_id: entry.id,
            kind: ViolationKind::ReferenceNotPaid,
            description: format!("referenced payout {} is {}", payout.id, payout.status),
        }),
        Some(_) => {}
        None => violations.push(Violation {
            entry_id: entry.id,
            kind: ViolationKind::DanglingReference,
            description: "referenced payout does not exist in this lineage".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use pil_types::{ActorId, ConversionId, LedgerType, PayoutTotals};

    use super::*;
    use crate::testing::{march, now, partner, Harness};
    use crate::traits::IsolationLevel;

    fn payout(hasher: &SnapshotHasher, status: LedgerStatus) -> PayoutLedgerEntry {
        let conversion_ids = vec![ConversionId::new("c1").unwrap()];
        PayoutLedgerEntry {
            id: LedgerEntryId::new(),
            partner_id: partner(),
            period: march(),
            ledger_type: LedgerType::Payout,
            status,
            snapshot_hash: Some(hasher.hash(&conversion_ids)),
            conversion_ids,
            totals: PayoutTotals::default(),
            version: 1,
            reference_ledger_id: None,
            adjustment_reason: None,
            approved_by: ActorId::new("admin").unwrap(),
            approved_at: now(),
        }
    }

    fn adjustment(of: &PayoutLedgerEntry, version: u32) -> PayoutLedgerEntry {
        PayoutLedgerEntry {
            id: LedgerEntryId::new(),
            ledger_type: LedgerType::Adjustment,
            status: LedgerStatus::Approved,
            snapshot_hash: None,
            conversion_ids: Vec::new(),
            totals: PayoutTotals::correction(dec!(-1.25)),
            version,
            reference_ledger_id: Some(of.id),
            adjustment_reason: Some("refund".into()),
            ..of.clone()
        }
    }

    fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn healthy_lineage_is_clean() {
        let hasher = SnapshotHasher::default();
        let paid = payout(&hasher, LedgerStatus::Paid);
        let entries = vec![paid.clone(), adjustment(&paid, 2), adjustment(&paid, 3)];
        assert!(inspect(&hasher, &entries).is_empty());
    }

    #[test]
    fn tampered_conversions_break_the_snapshot() {
        let hasher = SnapshotHasher::default();
        let mut tampered = payout(&hasher, LedgerStatus::Approved);
        tampered.conversion_ids.push(ConversionId::new("c9").unwrap());
        assert_eq!(
            kinds(&inspect(&hasher, &[tampered])),
            vec![ViolationKind::SnapshotMismatch]
        );
    }

    #[test]
    fn two_live_payouts_are_reported() {
        let hasher = SnapshotHasher::default();
        let first = payout(&hasher, LedgerStatus::Approved);
        let second = payout(&hasher, LedgerStatus::Draft);
        let voided = payout(&hasher, LedgerStatus::Void);
        let violations = inspect(&hasher, &[voided, first, second.clone()]);
        assert_eq!(kinds(&violations), vec![ViolationKind::DuplicateLivePayout]);
        assert_eq!(violations[0].entry_id, second.id);
    }

    #[test]
    fn version_problems_are_reported() {
        let hasher = SnapshotHasher::default();
        let paid = payout(&hasher, LedgerStatus::Paid);
        let entries = vec![
            paid.clone(),
            adjustment(&paid, 3),
            adjustment(&paid, 3),
            adjustment(&paid, 2),
        ];
        assert_eq!(
            kinds(&inspect(&hasher, &entries)),
            vec![ViolationKind::DuplicateVersion, ViolationKind::NonMonotonicVersion]
        );
    }

    #[test]
    fn bad_references_are_reported() {
        let hasher = SnapshotHasher::default();
        let approved = payout(&hasher, LedgerStatus::Approved);
        let orphan = adjustment(&payout(&hasher, LedgerStatus::Paid), 2);
        let premature = adjustment(&approved, 2);
        let violations = inspect(&hasher, &[approved, premature, orphan]);
        assert_eq!(
            kinds(&violations),
            vec![ViolationKind::ReferenceNotPaid, ViolationKind::DanglingReference]
        );
    }

    #[test]
    fn malformed_adjustment_is_reported() {
        let hasher = SnapshotHasher::default();
        let paid = payout(&hasher, LedgerStatus::Paid);
        let mut bad = adjustment(&paid, 2);
        bad.totals.total_revenue = dec!(10);
        bad.adjustment_reason = None;
        assert_eq!(
            kinds(&inspect(&hasher, &[paid, bad])),
            vec![ViolationKind::MalformedAdjustment]
        );
    }

    #[tokio::test]
    async fn audits_persisted_entries() {
        let harness = Harness::new().await;
        let paid = payout(&harness.ctx.hasher, LedgerStatus::Paid);
        let adj = adjustment(&paid, 2);
        let mut tx = harness
            .ctx
            .store
            .begin(IsolationLevel::Serializable)
            .await
            .unwrap();
        tx.insert_entry(paid.clone()).await.unwrap();
        tx.insert_entry(adj.clone()).await.unwrap();
        tx.commit().await.unwrap();

        let auditor = LedgerAuditor::new(harness.ctx.clone());
        let lineage = auditor.audit_lineage(&partner(), &march()).await.unwrap();
        assert!(lineage.is_valid());
        assert_eq!(lineage.entry_count, 2);

        let single = auditor.audit_entry(&adj.id).await.unwrap();
        assert!(single.is_valid());
        assert_eq!(single.lineage, paid.lineage_key());
    }

    #[tokio::test]
    async fn audit_of_unknown_entry_is_not_found() {
        let harness = Harness::new().await;
        let err = LedgerAuditor::new(harness.ctx.clone())
            .audit_entry(&LedgerEntryId::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), pil_types::ErrorCode::NotFound);
    }
}
