//! Vision + sensor fusion diagnosis
//!
//! Reconciles what the camera saw with what the soil and air sensors say.
//! Labels are normalised into a small symptom vocabulary, readings into
//! discrete buckets, and a typed rule table is matched against both. The
//! highest-confidence matching rule wins; table order breaks ties.

use chrono::{DateTime, Duration, Utc};
use shared::validation::{is_optimal_soil_ph, validate_sensor_reading, validate_vision_detection};
use shared::{
    Detection, DiagnosisKind, DiagnosisSeverity, FusionDiagnosis, HumidityBucket, MoistureBucket,
    PhBucket, SensorBuckets, SensorFreshness, SensorInput, SensorReading, Symptom,
    TemperatureBucket, VisionInput,
};

use crate::config::Config;

/// Confidence of the no-match sentinel
pub const UNCERTAIN_CONFIDENCE: f64 = 0.5;

// ============================================================================
// Symptom normalisation
// ============================================================================

/// Keyword groups checked in order; the first hit decides the symptom
const SYMPTOM_KEYWORDS: &[(Symptom, &[&str])] = &[
    (Symptom::Healthy, &["healthy"]),
    (Symptom::LeafCurl, &["curl"]),
    (Symptom::Wilting, &["wilt"]),
    (
        Symptom::Spots,
        &["spot", "blight", "lesion", "septoria", "mold", "mildew"],
    ),
    (Symptom::YellowLeaves, &["yellow", "chlorosis"]),
    (Symptom::Browning, &["brown", "scorch", "necro"]),
    (Symptom::Discoloration, &["discolor", "mosaic", "mottle"]),
    (Symptom::RootIssues, &["root", "rot"]),
];

/// Map a free-form vision label onto the symptom vocabulary
pub fn normalize_symptom(label: &str) -> Symptom {
    let label = label.to_lowercase();
    SYMPTOM_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
        .map(|(symptom, _)| *symptom)
        .unwrap_or(Symptom::Unknown)
}

// ============================================================================
// Sensor bucketing
// ============================================================================

pub fn moisture_bucket(percent: f64) -> MoistureBucket {
    if percent < 20.0 {
        MoistureBucket::Dry
    } else if percent < 40.0 {
        MoistureBucket::Moderate
    } else if percent < 70.0 {
        MoistureBucket::Optimal
    } else {
        MoistureBucket::Wet
    }
}

pub fn temperature_bucket(celsius: f64) -> TemperatureBucket {
    if celsius < 10.0 {
        TemperatureBucket::Cold
    } else if celsius < 25.0 {
        TemperatureBucket::Optimal
    } else if celsius < 30.0 {
        TemperatureBucket::Warm
    } else {
        TemperatureBucket::Hot
    }
}

pub fn humidity_bucket(percent: f64) -> HumidityBucket {
    if percent < 70.0 {
        HumidityBucket::Moderate
    } else if percent < 85.0 {
        HumidityBucket::Humid
    } else {
        HumidityBucket::VeryHumid
    }
}

pub fn ph_bucket(ph: f64) -> PhBucket {
    if ph < 6.0 {
        PhBucket::Acidic
    } else if is_optimal_soil_ph(ph) {
        PhBucket::Optimal
    } else {
        PhBucket::Alkaline
    }
}

pub fn categorize(reading: &SensorReading) -> SensorBuckets {
    SensorBuckets {
        moisture: moisture_bucket(reading.soil_moisture_percent),
        air_temperature: temperature_bucket(reading.air_temperature_c),
        soil_temperature: temperature_bucket(reading.soil_temperature_c),
        humidity: humidity_bucket(reading.air_humidity_percent),
        ph: ph_bucket(reading.soil_ph),
    }
}

// ============================================================================
// Rule table
// ============================================================================

/// One sensor dimension a rule cares about, with its accepted buckets
#[derive(Debug, Clone, Copy)]
pub enum SensorCondition {
    Moisture(&'static [MoistureBucket]),
    AirTemperature(&'static [TemperatureBucket]),
    SoilTemperature(&'static [TemperatureBucket]),
    Humidity(&'static [HumidityBucket]),
    Ph(&'static [PhBucket]),
}

impl SensorCondition {
    pub fn accepts(&self, buckets: &SensorBuckets) -> bool {
        match self {
            SensorCondition::Moisture(accepted) => accepted.contains(&buckets.moisture),
            SensorCondition::AirTemperature(accepted) => accepted.contains(&buckets.air_temperature),
            SensorCondition::SoilTemperature(accepted) => {
                accepted.contains(&buckets.soil_temperature)
            }
            SensorCondition::Humidity(accepted) => accepted.contains(&buckets.humidity),
            SensorCondition::Ph(accepted) => accepted.contains(&buckets.ph),
        }
    }
}

/// A (symptom set, sensor conditions) → diagnosis mapping with a fixed weight.
///
/// Dimensions absent from `conditions` are "don't care".
#[derive(Debug, Clone, Copy)]
pub struct FusionRule {
    pub id: &'static str,
    pub symptoms: &'static [Symptom],
    pub conditions: &'static [SensorCondition],
    pub diagnosis: &'static str,
    pub confidence: f64,
    pub severity: DiagnosisSeverity,
    pub action: &'static str,
}

impl FusionRule {
    pub fn matches(&self, symptom: Symptom, buckets: &SensorBuckets) -> bool {
        self.symptoms.contains(&symptom) && self.conditions.iter().all(|c| c.accepts(buckets))
    }
}

const WARM_OR_HOT: &[TemperatureBucket] = &[TemperatureBucket::Warm, TemperatureBucket::Hot];
const NOT_DRY: &[MoistureBucket] = &[
    MoistureBucket::Moderate,
    MoistureBucket::Optimal,
    MoistureBucket::Wet,
];

pub static FUSION_RULES: &[FusionRule] = &[
    FusionRule {
        id: "drought_stress",
        symptoms: &[
            Symptom::LeafCurl,
            Symptom::Wilting,
            Symptom::YellowLeaves,
            Symptom::Browning,
        ],
        conditions: &[
            SensorCondition::Moisture(&[MoistureBucket::Dry]),
            SensorCondition::AirTemperature(WARM_OR_HOT),
        ],
        diagnosis: "Drought stress",
        confidence: 0.95,
        severity: DiagnosisSeverity::High,
        action: "Irrigate immediately; hold fungicide until moisture recovers",
    },
    FusionRule {
        id: "fungal_infection",
        symptoms: &[
            Symptom::Spots,
            Symptom::Browning,
            Symptom::Discoloration,
            Symptom::LeafCurl,
        ],
        conditions: &[
            SensorCondition::Humidity(&[HumidityBucket::Humid, HumidityBucket::VeryHumid]),
            SensorCondition::Moisture(&[MoistureBucket::Optimal, MoistureBucket::Wet]),
        ],
        diagnosis: "Fungal infection",
        confidence: 0.90,
        severity: DiagnosisSeverity::High,
        action: "Apply targeted fungicide to affected zones and improve airflow",
    },
    FusionRule {
        id: "root_rot",
        symptoms: &[Symptom::Wilting, Symptom::YellowLeaves, Symptom::RootIssues],
        conditions: &[SensorCondition::Moisture(&[MoistureBucket::Wet])],
        diagnosis: "Root rot from waterlogging",
        confidence: 0.88,
        severity: DiagnosisSeverity::High,
        action: "Stop irrigation and improve drainage",
    },
    FusionRule {
        id: "nutrient_lockout",
        symptoms: &[Symptom::YellowLeaves, Symptom::Discoloration],
        conditions: &[
            SensorCondition::Ph(&[PhBucket::Acidic, PhBucket::Alkaline]),
            SensorCondition::Moisture(&[MoistureBucket::Moderate, MoistureBucket::Optimal]),
        ],
        diagnosis: "Nutrient lockout from soil pH",
        confidence: 0.85,
        severity: DiagnosisSeverity::Medium,
        action: "Test soil and correct pH before fertilising",
    },
    FusionRule {
        id: "heat_stress",
        symptoms: &[Symptom::Wilting, Symptom::LeafCurl, Symptom::Browning],
        conditions: &[
            SensorCondition::AirTemperature(&[TemperatureBucket::Hot]),
            SensorCondition::Moisture(NOT_DRY),
        ],
        diagnosis: "Heat stress",
        confidence: 0.80,
        severity: DiagnosisSeverity::Medium,
        action: "Provide shade or misting during peak heat",
    },
    FusionRule {
        id: "cold_damage",
        symptoms: &[Symptom::Discoloration, Symptom::Browning, Symptom::Spots],
        conditions: &[SensorCondition::AirTemperature(&[TemperatureBucket::Cold])],
        diagnosis: "Cold damage",
        confidence: 0.75,
        severity: DiagnosisSeverity::Medium,
        action: "Cover plants overnight and delay spraying until temperatures rise",
    },
    FusionRule {
        id: "bacterial_leaf_spot",
        symptoms: &[Symptom::Spots],
        conditions: &[
            SensorCondition::Humidity(&[HumidityBucket::VeryHumid]),
            SensorCondition::AirTemperature(WARM_OR_HOT),
        ],
        diagnosis: "Bacterial leaf spot",
        confidence: 0.92,
        severity: DiagnosisSeverity::High,
        action: "Apply copper-based bactericide and avoid overhead watering",
    },
    FusionRule {
        id: "viral_leaf_curl",
        symptoms: &[Symptom::LeafCurl],
        conditions: &[SensorCondition::Moisture(NOT_DRY)],
        diagnosis: "Viral leaf curl",
        confidence: 0.70,
        severity: DiagnosisSeverity::High,
        action: "Remove infected plants and control whitefly vectors",
    },
    FusionRule {
        id: "healthy_confirmed",
        symptoms: &[Symptom::Healthy],
        conditions: &[SensorCondition::Moisture(&[
            MoistureBucket::Moderate,
            MoistureBucket::Optimal,
        ])],
        diagnosis: "Healthy crop",
        confidence: 0.95,
        severity: DiagnosisSeverity::None,
        action: "Continue routine monitoring",
    },
    FusionRule {
        id: "healthy_drought_risk",
        symptoms: &[Symptom::Healthy],
        conditions: &[SensorCondition::Moisture(&[MoistureBucket::Dry])],
        diagnosis: "Healthy but at drought risk",
        confidence: 0.75,
        severity: DiagnosisSeverity::Low,
        action: "Schedule irrigation within 24 hours",
    },
];

/// Highest-confidence matching rule; the earlier rule wins a tie
pub fn best_match(symptom: Symptom, buckets: &SensorBuckets) -> Option<&'static FusionRule> {
    let mut best: Option<&'static FusionRule> = None;
    for rule in FUSION_RULES.iter().filter(|r| r.matches(symptom, buckets)) {
        match best {
            Some(current) if rule.confidence <= current.confidence => {}
            _ => best = Some(rule),
        }
    }
    best
}

// ============================================================================
// Fusion service
// ============================================================================

/// Fusion engine for one mission
#[derive(Debug, Clone)]
pub struct FusionService {
    sensor_max_age: Duration,
    vision_only_factor: f64,
    window_size: usize,
}

impl FusionService {
    pub fn new(sensor_max_age: Duration, vision_only_factor: f64, window_size: usize) -> Self {
        Self {
            sensor_max_age,
            vision_only_factor,
            window_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::seconds(config.fusion.sensor_max_age_seconds),
            config.fusion.vision_only_factor,
            config.fusion.window_size,
        )
    }

    /// The `window_size` most recent detections, oldest first.
    ///
    /// Ordered by timestamp with frame id breaking ties.
    pub fn select_window<'a>(&self, detections: &'a [Detection]) -> Vec<&'a Detection> {
        let mut ordered: Vec<&Detection> = detections.iter().collect();
        ordered.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.frame_id.cmp(&b.frame_id))
                .then_with(|| a.id.cmp(&b.id))
        });
        let skip = ordered.len().saturating_sub(self.window_size);
        ordered.into_iter().skip(skip).collect()
    }

    /// Diagnose one detection's top classification against a reading.
    ///
    /// Returns `None` for detections with no usable classification; those
    /// are quarantined rather than guessed at.
    pub fn perform_fusion(
        &self,
        detection: &Detection,
        reading: Option<&SensorReading>,
        now: DateTime<Utc>,
    ) -> Option<FusionDiagnosis> {
        if let Err(reason) = validate_vision_detection(detection) {
            tracing::warn!(
                detection_id = %detection.id,
                frame_id = detection.frame_id,
                reason,
                "Skipping detection for fusion"
            );
            return None;
        }
        let top = detection.top_classification()?;

        let vision = VisionInput {
            detection_id: detection.id.clone(),
            frame_id: detection.frame_id,
            label: top.label.clone(),
            confidence: top.confidence,
            symptom: normalize_symptom(&top.label),
        };

        let Some(reading) = reading else {
            return Some(self.vision_only(
                vision,
                detection.timestamp,
                DiagnosisKind::VisionOnly,
                vec!["no sensor reading available".to_string()],
                Vec::new(),
            ));
        };

        if let Err(errors) = validate_sensor_reading(reading) {
            tracing::warn!(
                detection_id = %detection.id,
                errors = ?errors,
                "Sensor reading out of range, falling back to vision-only diagnosis"
            );
            return Some(self.vision_only(
                vision,
                detection.timestamp,
                DiagnosisKind::SensorError,
                vec!["sensor reading failed validation".to_string()],
                errors,
            ));
        }

        let age = reading.age(now);
        let mut warnings = Vec::new();
        let freshness = if age > self.sensor_max_age {
            tracing::warn!(
                age_seconds = age.num_seconds(),
                max_age_seconds = self.sensor_max_age.num_seconds(),
                "Using stale sensor reading"
            );
            warnings.push(format!(
                "sensor reading is {}s old (max {}s)",
                age.num_seconds(),
                self.sensor_max_age.num_seconds()
            ));
            SensorFreshness::Stale
        } else {
            SensorFreshness::Fresh
        };

        let buckets = categorize(reading);
        let sensor = SensorInput {
            reading: reading.clone(),
            buckets,
            freshness,
            age_seconds: age.num_seconds(),
        };

        let diagnosis = match best_match(vision.symptom, &buckets) {
            Some(rule) => {
                tracing::debug!(
                    frame_id = vision.frame_id,
                    rule = rule.id,
                    confidence = rule.confidence,
                    "Fusion rule matched"
                );
                FusionDiagnosis {
                    kind: DiagnosisKind::Matched,
                    rule_id: rule.id.to_string(),
                    refined_diagnosis: rule.diagnosis.to_string(),
                    confidence: rule.confidence,
                    severity: rule.severity,
                    action: rule.action.to_string(),
                    vision_input: vision,
                    sensor_input: Some(sensor),
                    timestamp: detection.timestamp,
                    warnings,
                    validation_errors: Vec::new(),
                }
            }
            None => {
                tracing::debug!(frame_id = vision.frame_id, "No fusion rule matched");
                FusionDiagnosis {
                    kind: DiagnosisKind::Uncertain,
                    rule_id: "uncertain".to_string(),
                    refined_diagnosis: format!("Uncertain ({})", vision.label),
                    confidence: UNCERTAIN_CONFIDENCE,
                    severity: DiagnosisSeverity::Unknown,
                    action: "Manual field inspection recommended".to_string(),
                    vision_input: vision,
                    sensor_input: Some(sensor),
                    timestamp: detection.timestamp,
                    warnings,
                    validation_errors: Vec::new(),
                }
            }
        };

        Some(diagnosis)
    }

    /// One diagnosis per frame, in input order; frames without a usable
    /// classification are skipped
    pub fn batch<'a, I>(
        &self,
        detections: I,
        reading: Option<&SensorReading>,
        now: DateTime<Utc>,
    ) -> Vec<FusionDiagnosis>
    where
        I: IntoIterator<Item = &'a Detection>,
    {
        detections
            .into_iter()
            .filter_map(|d| self.perform_fusion(d, reading, now))
            .collect()
    }

    fn vision_only(
        &self,
        vision: VisionInput,
        timestamp: DateTime<Utc>,
        kind: DiagnosisKind,
        warnings: Vec<String>,
        validation_errors: Vec<String>,
    ) -> FusionDiagnosis {
        let (severity, action) = if vision.symptom == Symptom::Healthy {
            (DiagnosisSeverity::None, "Continue routine monitoring")
        } else {
            (
                DiagnosisSeverity::Medium,
                "Confirm with field sensors before treatment",
            )
        };

        FusionDiagnosis {
            kind,
            rule_id: match kind {
                DiagnosisKind::SensorError => "sensor_error".to_string(),
                _ => "vision_only".to_string(),
            },
            refined_diagnosis: vision.label.clone(),
            confidence: (vision.confidence * self.vision_only_factor).clamp(0.0, 1.0),
            severity,
            action: action.to_string(),
            vision_input: vision,
            sensor_input: None,
            timestamp,
            warnings,
            validation_errors,
        }
    }
}
