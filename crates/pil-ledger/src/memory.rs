use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use pil_types::{
    BillingPeriod, ConversionId, ConversionRecord, LedgerEntryId, LedgerStatus, LineageKey,
    PartnerId, PayoutLedgerEntry,
};

use crate::traits::{
    ConversionQuery, IsolationLevel, LedgerStore, LedgerTransaction, StoreError, StoreResult,
};

/// Partners and conversions to preload into an [`InMemoryLedgerStore`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFixtures {
    #[serde(default)]
    pub partners: Vec<PartnerId>,
    #[serde(default)]
    pub conversions: Vec<ConversionRecord>,
}

/// In-memory ledger store for tests, local demos, and embedding.
///
/// Every transaction holds the store's single async lock from `begin` until
/// it commits or is dropped, so all transactions run serially: every
/// requested isolation level is served as SERIALIZABLE. Writes apply in
/// place and are undone if the handle is dropped uncommitted.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

#[derive(Default)]
struct LedgerState {
    partners: HashSet<PartnerId>,
    conversions: HashMap<ConversionId, ConversionRecord>,
    entries: HashMap<LedgerEntryId, PayoutLedgerEntry>,
    order: Vec<LedgerEntryId>,
}

impl LedgerState {
    fn live_payout(&self, key: &LineageKey) -> Option<&PayoutLedgerEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .find(|e| e.is_live_payout() && e.partner_id == key.partner_id && e.period == key.period)
    }

    fn max_lineage_version(&self, root: &LedgerEntryId) -> Option<u32> {
        self.entries
            .values()
            .filter(|e| e.lineage_root() == *root)
            .map(|e| e.version)
            .max()
    }

    fn check_insert(&self, entry: &PayoutLedgerEntry) -> StoreResult<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(StoreError::UniqueViolation(format!(
                "entry {} already exists",
                entry.id
            )));
        }
        if entry.is_live_payout() {
            if let Some(existing) = self.live_payout(&entry.lineage_key()) {
                return Err(StoreError::UniqueViolation(format!(
                    "live payout {} already exists for {}",
                    existing.id,
                    entry.lineage_key()
                )));
            }
        }
        let root = entry.lineage_root();
        if self
            .entries
            .values()
            .any(|e| e.lineage_root() == root && e.version == entry.version)
        {
            return Err(StoreError::UniqueViolation(format!(
                "version {} already exists in lineage {root}",
                entry.version
            )));
        }
        Ok(())
    }
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_partner(&self, partner: PartnerId) {
        self.state.lock().await.partners.insert(partner);
    }

    /// Record an attributed conversion; its partner is registered implicitly.
    pub async fn record_conversion(&self, record: ConversionRecord) {
        let mut state = self.state.lock().await;
        state.partners.insert(record.partner_id.clone());
        state.conversions.insert(record.id.clone(), record);
    }

    pub async fn load_fixtures(&self, fixtures: LedgerFixtures) {
        let mut state = self.state.lock().await;
        state.partners.extend(fixtures.partners);
        for record in fixtures.conversions {
            state.partners.insert(record.partner_id.clone());
            state.conversions.insert(record.id.clone(), record);
        }
    }

    /// Number of ledger entries currently stored.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self, _isolation: IsolationLevel) -> StoreResult<Box<dyn LedgerTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            state: guard,
            undo: Vec::new(),
            committed: false,
        }))
    }

    async fn entry(&self, id: &LedgerEntryId) -> StoreResult<Option<PayoutLedgerEntry>> {
        Ok(self.state.lock().await.entries.get(id).cloned())
    }

    async fn entries_for(&self, key: &LineageKey) -> StoreResult<Vec<PayoutLedgerEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| e.partner_id == key.partner_id && e.period == key.period)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConversionQuery for InMemoryLedgerStore {
    async fn partner_exists(&self, partner: &PartnerId) -> StoreResult<bool> {
        Ok(self.state.lock().await.partners.contains(partner))
    }

    async fn conversions_in_period(
        &self,
        partner: &PartnerId,
        period: &BillingPeriod,
    ) -> StoreResult<Vec<ConversionRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<ConversionRecord> = state
            .conversions
            .values()
            .filter(|c| c.partner_id == *partner && period.contains(c.attributed_at))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.attributed_at
                .cmp(&b.attributed_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }
}

enum Undo {
    Insert(LedgerEntryId),
    Status {
        id: LedgerEntryId,
        previous: LedgerStatus,
    },
}

struct MemoryTransaction {
    state: OwnedMutexGuard<LedgerState>,
    undo: Vec<Undo>,
    committed: bool,
}

impl MemoryTransaction {
    fn rollback(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Insert(id) => {
                    self.state.entries.remove(&id);
                    self.state.order.retain(|existing| *existing != id);
                }
                Undo::Status { id, previous } => {
                    if let Some(entry) = self.state.entries.get_mut(&id) {
                        entry.status = previous;
                    }
                }
            }
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

#[async_trait]
impl LedgerTransaction for MemoryTransaction {
    async fn partner_exists(&mut self, partner: &PartnerId) -> StoreResult<bool> {
        Ok(self.state.partners.contains(partner))
    }

    async fn entry(&mut self, id: &LedgerEntryId) -> StoreResult<Option<PayoutLedgerEntry>> {
        Ok(self.state.entries.get(id).cloned())
    }

    async fn live_payout(&mut self, key: &LineageKey) -> StoreResult<Option<PayoutLedgerEntry>> {
        Ok(self.state.live_payout(key).cloned())
    }

    async fn max_lineage_version(&mut self, root: &LedgerEntryId) -> StoreResult<Option<u32>> {
        Ok(self.state.max_lineage_version(root))
    }

    async fn conversions_by_ids(
        &mut self,
        ids: &[ConversionId],
    ) -> StoreResult<Vec<ConversionRecord>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.state.conversions.get(id).cloned())
            .collect())
    }

    async fn insert_entry(&mut self, entry: PayoutLedgerEntry) -> StoreResult<()> {
        self.state.check_insert(&entry)?;
        let id = entry.id;
        self.state.entries.insert(id, entry);
        self.state.order.push(id);
        self.undo.push(Undo::Insert(id));
        Ok(())
    }

    async fn update_status(
        &mut self,
        id: &LedgerEntryId,
        status: LedgerStatus,
    ) -> StoreResult<()> {
        let current = self
            .state
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::MissingRow(format!("entry {id}")))?;

        if current.is_payout() && status.is_live() && !current.status.is_live() {
            if let Some(existing) = self.state.live_payout(&current.lineage_key()) {
                return Err(StoreError::UniqueViolation(format!(
                    "live payout {} already exists for {}",
                    existing.id,
                    current.lineage_key()
                )));
            }
        }

        if let Some(entry) = self.state.entries.get_mut(id) {
            entry.status = status;
        }
        self.undo.push(Undo::Status {
            id: *id,
            previous: current.status,
        });
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.committed = true;
        self.undo.clear();
        Ok(())
    }
}
