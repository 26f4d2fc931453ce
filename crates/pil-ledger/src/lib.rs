//! Payout ledger for the Payout Integrity Ledger (PIL).
//!
//! This crate owns the money path. It provides:
//! - `PayoutPreviewComputer`: read-only aggregation with a snapshot hash
//! - `PayoutApprovalTransaction`: hash-checked, serializable approval
//! - `AdjustmentLedgerWriter`: versioned corrections against paid payouts
//! - `StatusTransitions` for the disbursement lifecycle
//! - `LedgerAuditor` and `LineageProjection` for read-time verification
//! - `LedgerStore` / `LedgerTransaction` trait boundaries with an in-memory
//!   implementation for tests and embedding

pub mod adjustment;
pub mod approval;
pub mod audit;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod memory;
pub mod preview;
pub mod projection;
pub mod traits;
pub mod transition;

#[cfg(test)]
pub(crate) mod testing;

pub use adjustment::{AdjustmentLedgerWriter, AdjustmentRequest};
pub use approval::{ApprovalRequest, PayoutApprovalTransaction};
pub use audit::{AuditReport, LedgerAuditor, Violation, ViolationKind};
pub use config::LedgerConfig;
pub use context::LedgerContext;
pub use error::{LedgerError, LedgerResult};
pub use events::{BroadcastSink, EventSink, EventSinkError, NullSink, RecordingSink};
pub use memory::{InMemoryLedgerStore, LedgerFixtures};
pub use preview::{PayoutPreview, PayoutPreviewComputer};
pub use projection::{LineageProjection, LineageSummary};
pub use traits::{
    ConversionQuery, IsolationLevel, LedgerStore, LedgerTransaction, StoreError, StoreResult,
};
pub use transition::StatusTransitions;
