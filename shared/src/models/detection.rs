//! Vision detection models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::GpsCoordinates;

/// Label the vision model emits for disease-free foliage
pub const HEALTHY_LABEL: &str = "healthy";

/// One geotagged detection event for a single video frame.
///
/// Produced by the external vision collaborator and never mutated here.
/// Arrival order is not timestamp order; `frame_id` breaks ties.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub id: String,
    pub frame_id: u64,
    pub timestamp: DateTime<Utc>,
    pub gps: Option<GpsCoordinates>,
    pub classifications: Vec<Classification>,
}

/// A single label/confidence pair from the vision model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Healthy iff the label names the healthy class (e.g. "Tomato_healthy")
    pub fn is_healthy(&self) -> bool {
        self.label.to_lowercase().contains(HEALTHY_LABEL)
    }
}

impl Detection {
    /// Highest-confidence classification; the first one wins a tie
    pub fn top_classification(&self) -> Option<&Classification> {
        self.classifications.iter().fold(None, |best, c| match best {
            Some(b) if c.confidence.total_cmp(&b.confidence).is_le() => Some(b),
            _ => Some(c),
        })
    }

    /// True when the top classification is a disease label
    pub fn is_infected(&self) -> bool {
        self.top_classification()
            .map(|c| !c.is_healthy())
            .unwrap_or(false)
    }

    /// Usable GPS fix, if any
    pub fn position(&self) -> Option<GpsCoordinates> {
        self.gps.filter(|g| g.is_valid())
    }
}
