// GPS fix records as written by the capture process, and the metrics folded from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// The device writes `null` for a DOP it could not compute.
fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dop {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub gdop: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub hdop: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub pdop: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub tdop: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub vdop: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satellites {
    #[serde(default)]
    pub seen: i64,
    #[serde(default)]
    pub used: i64,
}

/// One record of a GPS batch file. Batches are a JSON array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    #[serde(default)]
    pub dop: Option<Dop>,
    #[serde(default)]
    pub satellites: Option<Satellites>,
    pub fix: String,
    pub systemtime: DateTime<Utc>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl GpsFix {
    /// Fix quality tag the device writes when it has no fix.
    pub const NO_FIX: &'static str = "None";

    pub fn has_fix(&self) -> bool {
        self.fix != Self::NO_FIX
    }
}

/// The seven averaged metrics; serializes to the snake_case names used as JSON keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpsMetric {
    Gdop,
    Hdop,
    Pdop,
    Tdop,
    Vdop,
    SatSeen,
    SatUsed,
}

impl GpsMetric {
    pub const ALL: [GpsMetric; 7] = [
        GpsMetric::Gdop,
        GpsMetric::Hdop,
        GpsMetric::Pdop,
        GpsMetric::Tdop,
        GpsMetric::Vdop,
        GpsMetric::SatSeen,
        GpsMetric::SatUsed,
    ];
}
