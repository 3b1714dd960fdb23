// Incremental mean for one (metric, minute bucket) pair, and the minute bucketing itself.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Raw DOP value the GPS device writes for "invalid"; folded as 0.
pub const INVALID_DOP: f64 = 99.99;

/// Minutes since the Unix epoch of the fix's own timestamp.
pub type BucketKey = i64;

pub fn bucket_key(ts: DateTime<Utc>) -> BucketKey {
    ts.timestamp().div_euclid(60)
}

#[allow(clippy::float_cmp)] // exact device sentinel, not a computed value
pub fn normalize(value: f64) -> f64 {
    if value == INVALID_DOP { 0.0 } else { value }
}

/// `value` is always `sum / count`; it is only changed through [`Average::fold`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Average {
    count: u64,
    sum: f64,
    value: f64,
    ts: DateTime<Utc>,
}

impl Average {
    pub fn new(value: f64, ts: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            sum: value,
            value,
            ts,
        }
    }

    /// Adds one sample; `ts` advances to the newest fix folded into the bucket.
    pub fn fold(&mut self, value: f64, ts: DateTime<Utc>) {
        self.count += 1;
        self.sum += value;
        self.value = self.sum / self.count as f64;
        if ts > self.ts {
            self.ts = ts;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Last update, in device time.
    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }
}
