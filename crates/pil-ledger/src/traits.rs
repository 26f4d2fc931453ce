use async_trait::async_trait;

use pil_types::{
    BillingPeriod, ConversionId, ConversionRecord, LedgerEntryId, LedgerStatus, LineageKey,
    PartnerId, PayoutLedgerEntry,
};

/// Failures reported by a transactional store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint (live payout per period, version per lineage) fired.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The store aborted the transaction to preserve serializability.
    #[error("serialization failure: {0}")]
    SerializationFailure(String),

    #[error("row not found: {0}")]
    MissingRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Isolation level requested when opening a transaction.
///
/// Stores may run a transaction at a stricter level than requested, never a
/// weaker one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// Transactional boundary of the ledger store.
///
/// Implementations must satisfy:
/// - Entries are append-only; the only mutation is `update_status`.
/// - At most one live payout per `(partner, period)` and one entry per
///   `(lineage root, version)`; violations surface as
///   [`StoreError::UniqueViolation`].
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self, isolation: IsolationLevel) -> StoreResult<Box<dyn LedgerTransaction>>;

    /// Read one entry outside any transaction.
    async fn entry(&self, id: &LedgerEntryId) -> StoreResult<Option<PayoutLedgerEntry>>;

    /// Every entry of a partner's period (payouts and adjustments) in
    /// creation order.
    async fn entries_for(&self, key: &LineageKey) -> StoreResult<Vec<PayoutLedgerEntry>>;
}

/// An open transaction handle, passed by value into each operation.
///
/// Dropping the handle without calling [`LedgerTransaction::commit`] rolls
/// back every write made through it.
#[async_trait]
pub trait LedgerTransaction: Send {
    async fn partner_exists(&mut self, partner: &PartnerId) -> StoreResult<bool>;

    async fn entry(&mut self, id: &LedgerEntryId) -> StoreResult<Option<PayoutLedgerEntry>>;

    /// The payout with status in `{DRAFT, APPROVED, PAID}` for the period, if any.
    async fn live_payout(&mut self, key: &LineageKey) -> StoreResult<Option<PayoutLedgerEntry>>;

    /// Highest version among the payout `root` and its adjustments.
    async fn max_lineage_version(&mut self, root: &LedgerEntryId) -> StoreResult<Option<u32>>;

    /// Conversion records for the given ids, in the order requested. Ids
    /// with no record are omitted.
    async fn conversions_by_ids(
        &mut self,
        ids: &[ConversionId],
    ) -> StoreResult<Vec<ConversionRecord>>;

    async fn insert_entry(&mut self, entry: PayoutLedgerEntry) -> StoreResult<()>;

    async fn update_status(&mut self, id: &LedgerEntryId, status: LedgerStatus)
        -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// External collaborator selecting the conversions eligible for a payout.
#[async_trait]
pub trait ConversionQuery: Send + Sync {
    async fn partner_exists(&self, partner: &PartnerId) -> StoreResult<bool>;

    /// Conversions attributed to the partner's lineage with
    /// `start <= attributed_at <= end`, in canonical order.
    async fn conversions_in_period(
        &self,
        partner: &PartnerId,
        period: &BillingPeriod,
    ) -> StoreResult<Vec<ConversionRecord>>;
}
