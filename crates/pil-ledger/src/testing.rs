//! Shared fixtures for the ledger unit tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use pil_types::{
    ActorId, BillingPeriod, ConversionId, ConversionRecord, FixedClock, PartnerId,
};

use crate::context::LedgerContext;
use crate::events::RecordingSink;
use crate::memory::InMemoryLedgerStore;

pub(crate) struct Harness {
    pub store: InMemoryLedgerStore,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub ctx: LedgerContext,
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
}

pub(crate) fn partner() -> PartnerId {
    PartnerId::new("P1").unwrap()
}

pub(crate) fn approver() -> ActorId {
    ActorId::new("finance-admin").unwrap()
}

pub(crate) fn march() -> BillingPeriod {
    BillingPeriod::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
    )
    .unwrap()
}

pub(crate) fn ids(raw: &[&str]) -> Vec<ConversionId> {
    raw.iter().map(|s| ConversionId::new(*s).unwrap()).collect()
}

pub(crate) fn conversion(id: &str, day: u32, amount: Decimal, commission: Decimal) -> ConversionRecord {
    ConversionRecord {
        id: ConversionId::new(id).unwrap(),
        partner_id: partner(),
        link_id: "link-1".into(),
        cafe_id: Some("cafe-1".into()),
        amount,
        commission,
        attributed_at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
    }
}

impl Harness {
    pub async fn new() -> Self {
        let store = InMemoryLedgerStore::new();
        store.register_partner(partner()).await;
        let clock = Arc::new(FixedClock::new(now()));
        let sink = Arc::new(RecordingSink::new());
        let ctx = LedgerContext::new(Arc::new(store.clone()), Arc::new(store.clone()))
            .with_clock(clock.clone())
            .with_events(sink.clone());
        Self {
            store,
            clock,
            sink,
            ctx,
        }
    }

    /// Harness with conversions c1, c2, c3 attributed to P1 in March.
    pub async fn with_march_conversions() -> Self {
        let harness = Self::new().await;
        for (id, day, amount, commission) in [
            ("c1", 3, Decimal::new(10_000, 2), Decimal::new(1_000, 2)),
            ("c2", 9, Decimal::new(2_550, 2), Decimal::new(255, 2)),
            ("c3", 21, Decimal::new(1_999, 2), Decimal::new(200, 2)),
        ] {
            harness
                .store
                .record_conversion(conversion(id, day, amount, commission))
                .await;
        }
        harness
    }
}
