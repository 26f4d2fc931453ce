use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::LedgerEntryId;
use crate::ledger::LedgerStatus;

/// The opaque message delivered to status subscribers:
/// `{"status":"APPROVED","timestamp":"<ISO-8601>"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub status: LedgerStatus,
    pub timestamp: DateTime<Utc>,
}

/// A status change addressed to one entry's logical channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEvent {
    pub entry_id: LedgerEntryId,
    pub message: StatusMessage,
}

impl StatusEvent {
    pub fn new(entry_id: LedgerEntryId, status: LedgerStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            entry_id,
            message: StatusMessage { status, timestamp },
        }
    }

    /// Channel name keyed by the entry id.
    pub fn channel(&self) -> String {
        Self::channel_for(&self.entry_id)
    }

    pub fn channel_for(entry_id: &LedgerEntryId) -> String {
        format!("payout:{entry_id}:status")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn message_wire_shape() {
        let at = Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap();
        let event = StatusEvent::new(LedgerEntryId::new(), LedgerStatus::Approved, at);
        let json = serde_json::to_string(&event.message).unwrap();
        assert_eq!(
            json,
            r#"{"status":"APPROVED","timestamp":"2024-04-02T09:30:00Z"}"#
        );
    }

    #[test]
    fn channel_is_keyed_by_entry() {
        let id = LedgerEntryId::new();
        let event = StatusEvent::new(id, LedgerStatus::Paid, Utc::now());
        assert_eq!(event.channel(), format!("payout:{id}:status"));
        assert_ne!(event.channel(), StatusEvent::channel_for(&LedgerEntryId::new()));
    }
}
