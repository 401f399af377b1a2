//! Environmental sensor models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A polled snapshot from the field sensor node
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    #[validate(range(min = 0.0, max = 100.0, message = "soil moisture must be within 0-100%"))]
    pub soil_moisture_percent: f64,
    #[validate(range(min = -50.0, max = 70.0, message = "soil temperature must be within -50..70 °C"))]
    pub soil_temperature_c: f64,
    #[validate(range(min = 0.0, max = 14.0, message = "soil pH must be within 0-14"))]
    pub soil_ph: f64,
    #[validate(range(min = -50.0, max = 70.0, message = "air temperature must be within -50..70 °C"))]
    pub air_temperature_c: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "air humidity must be within 0-100%"))]
    pub air_humidity_percent: f64,
}

impl SensorReading {
    /// Age of the reading at `now`; negative ages (clock skew) count as fresh
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).max(Duration::zero())
    }

    /// Older than `max_age` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) > max_age
    }
}

/// Freshness of the reading a diagnosis was made with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensorFreshness {
    Fresh,
    Stale,
}
