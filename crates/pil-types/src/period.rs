use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TypeError;

/// A billing window. Construction guarantees `start < end`.
///
/// Serialized flat as `periodStart` / `periodEnd` so it can be embedded in
/// request and ledger payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingPeriod {
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, TypeError> {
        if start >= end {
            return Err(TypeError::InvalidPeriod {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            period_start: start,
            period_end: end,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.period_start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.period_end
    }

    /// Attribution window test used when selecting source records.
    /// Both bounds are inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.period_start && at <= self.period_end
    }
}

impl fmt::Debug for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BillingPeriod({self})")
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.period_start.to_rfc3339(),
            self.period_end.to_rfc3339()
        )
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            period_start: DateTime<Utc>,
            period_end: DateTime<Utc>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.period_start, raw.period_end).map_err(serde::de::Error::custom)
    }
}
