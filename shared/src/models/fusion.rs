//! Vision + sensor fusion diagnosis models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sensor::{SensorFreshness, SensorReading};

/// Normalised symptom vocabulary derived from free-form vision labels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    Healthy,
    YellowLeaves,
    Wilting,
    LeafCurl,
    Spots,
    Browning,
    Discoloration,
    RootIssues,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MoistureBucket {
    Dry,
    Moderate,
    Optimal,
    Wet,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBucket {
    Cold,
    Optimal,
    Warm,
    Hot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HumidityBucket {
    Moderate,
    Humid,
    VeryHumid,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhBucket {
    Acidic,
    Optimal,
    Alkaline,
}

/// Discrete buckets for every sensor dimension of one reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorBuckets {
    pub moisture: MoistureBucket,
    pub air_temperature: TemperatureBucket,
    pub soil_temperature: TemperatureBucket,
    pub humidity: HumidityBucket,
    pub ph: PhBucket,
}

/// Diagnosis severity; `Unknown` only on the uncertain sentinel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisSeverity {
    Unknown,
    None,
    Low,
    Medium,
    High,
}

/// How a diagnosis was reached
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisKind {
    /// A fusion rule matched
    Matched,
    /// Sensor data usable but no rule matched
    Uncertain,
    /// No sensor reading available
    VisionOnly,
    /// Sensor reading failed range validation; vision-only fallback
    SensorError,
}

/// The vision side of a fusion input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisionInput {
    pub detection_id: String,
    pub frame_id: u64,
    pub label: String,
    pub confidence: f64,
    pub symptom: Symptom,
}

/// The sensor side of a fusion input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorInput {
    pub reading: SensorReading,
    pub buckets: SensorBuckets,
    pub freshness: SensorFreshness,
    pub age_seconds: i64,
}

/// Context-aware diagnosis for one frame
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FusionDiagnosis {
    pub kind: DiagnosisKind,
    pub rule_id: String,
    pub refined_diagnosis: String,
    /// Within [0, 1]
    pub confidence: f64,
    pub severity: DiagnosisSeverity,
    pub action: String,
    pub vision_input: VisionInput,
    pub sensor_input: Option<SensorInput>,
    /// Taken from the detection, so identical inputs give identical output
    pub timestamp: DateTime<Utc>,
    pub warnings: Vec<String>,
    pub validation_errors: Vec<String>,
}

impl FusionDiagnosis {
    pub fn is_matched(&self) -> bool {
        self.kind == DiagnosisKind::Matched
    }
}
