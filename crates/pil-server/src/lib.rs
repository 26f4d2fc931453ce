//! HTTP server for the Payout Integrity Ledger.
//!
//! Exposes payout preview, approval, adjustment, and status transitions,
//! per-entry status streams over server-sent events, ledger audits, and
//! document provenance chains as a JSON API.

pub mod actor;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use actor::{Actor, ACTOR_HEADER};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorBody, ServerError, ServerResult};
pub use server::PilServer;
pub use state::AppState;
