//! Alert decision engine
//!
//! Alerts are recomputed from current signals on every refresh tick. An
//! alert keeps its identity across ticks through `{rule_id}:{entity}`,
//! which is what lets acknowledgment and scheduling survive recomputation.
//! This is the only component with temporal state.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::validate_sensor_reading;
use shared::{
    Alert, AlertMetadata, AlertType, DiagnosisSeverity, EconomicImpact, FusionDiagnosis,
    GridStats, SensorReading,
};

use crate::config::{AlertConfig, Config};
use crate::error::{PipelineError, PipelineResult};

// ============================================================================
// Signals
// ============================================================================

/// Every upstream output flattened into one normalised record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertSignals {
    pub infection_percentage: f64,
    pub infected_cells: usize,
    pub total_detections: u32,
    pub has_infection: bool,
    pub roi_percentage: Option<Decimal>,
    pub net_benefit: Option<Decimal>,
    /// Revenue lost if the infection is left untreated
    pub estimated_loss: Option<Decimal>,
    /// Revenue protected by treating
    pub savings_potential: Option<Decimal>,
    pub soil_moisture: Option<f64>,
    pub soil_temperature: Option<f64>,
    pub soil_ph: Option<f64>,
    pub air_temperature: Option<f64>,
    pub air_humidity: Option<f64>,
    pub sensor_missing: bool,
    pub sensor_invalid: bool,
    pub sensor_stale: bool,
    /// Most severe diagnosis in the fusion window
    pub fusion_diagnosis: Option<FusionDiagnosis>,
}

impl AlertSignals {
    fn metadata(&self) -> AlertMetadata {
        AlertMetadata {
            infection_percentage: self.infection_percentage,
            affected_cells: self.infected_cells,
            estimated_loss: self.estimated_loss,
            savings_potential: self.savings_potential,
            roi_percentage: self.roi_percentage,
        }
    }
}

/// Flatten grid, economics, fusion and the latest reading into signals.
///
/// Out-of-range readings contribute no sensor values; they only set
/// `sensor_invalid`.
pub fn extract_signals(
    stats: &GridStats,
    impact: &EconomicImpact,
    diagnoses: &[FusionDiagnosis],
    reading: Option<&SensorReading>,
    now: DateTime<Utc>,
    sensor_max_age: Duration,
) -> AlertSignals {
    let financial = impact.financial_data.as_ref();

    let valid_reading = reading.filter(|r| validate_sensor_reading(r).is_ok());

    AlertSignals {
        infection_percentage: stats.infected_percentage,
        infected_cells: stats.infected_count,
        total_detections: stats.total_detections,
        has_infection: stats.has_infection(),
        roi_percentage: impact.roi_percentage(),
        net_benefit: impact.net_benefit(),
        estimated_loss: financial.map(|f| f.financial_loss_untreated),
        savings_potential: financial.map(|f| f.money_saved_by_treatment),
        soil_moisture: valid_reading.map(|r| r.soil_moisture_percent),
        soil_temperature: valid_reading.map(|r| r.soil_temperature_c),
        soil_ph: valid_reading.map(|r| r.soil_ph),
        air_temperature: valid_reading.map(|r| r.air_temperature_c),
        air_humidity: valid_reading.map(|r| r.air_humidity_percent),
        sensor_missing: reading.is_none(),
        sensor_invalid: reading.is_some() && valid_reading.is_none(),
        sensor_stale: valid_reading
            .map(|r| r.is_stale(now, sensor_max_age))
            .unwrap_or(false),
        fusion_diagnosis: most_severe(diagnoses).cloned(),
    }
}

/// Highest severity, then highest confidence; earliest wins a tie
fn most_severe(diagnoses: &[FusionDiagnosis]) -> Option<&FusionDiagnosis> {
    let mut best: Option<&FusionDiagnosis> = None;
    for d in diagnoses {
        match best {
            Some(b)
                if (d.severity, d.confidence)
                    .partial_cmp(&(b.severity, b.confidence))
                    .map(|o| o.is_le())
                    .unwrap_or(true) => {}
            _ => best = Some(d),
        }
    }
    best
}

// ============================================================================
// Rules
// ============================================================================

/// Alerts in the same group describe overlapping conditions; lower-severity
/// ones are dropped when a more severe alert in the group fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictGroup {
    Infection,
    Economics,
    Moisture,
    Climate,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertRule {
    DiseaseCritical,
    DiseaseWarning,
    DiseaseDetected,
    FieldHealthy,
    FusionConfirmed,
    FungalRisk,
    TreatmentUnprofitable,
    DroughtStress,
    Waterlogging,
    HeatStress,
    SensorInvalid,
    SensorStale,
    SensorMissing,
}

/// Evaluation order; also the display order within a severity
pub const ALERT_RULES: &[AlertRule] = &[
    AlertRule::DiseaseCritical,
    AlertRule::DiseaseWarning,
    AlertRule::DiseaseDetected,
    AlertRule::FieldHealthy,
    AlertRule::FusionConfirmed,
    AlertRule::FungalRisk,
    AlertRule::TreatmentUnprofitable,
    AlertRule::DroughtStress,
    AlertRule::Waterlogging,
    AlertRule::HeatStress,
    AlertRule::SensorInvalid,
    AlertRule::SensorStale,
    AlertRule::SensorMissing,
];

impl AlertRule {
    pub fn id(&self) -> &'static str {
        match self {
            AlertRule::DiseaseCritical => "disease_critical",
            AlertRule::DiseaseWarning => "disease_warning",
            AlertRule::DiseaseDetected => "disease_detected",
            AlertRule::FieldHealthy => "field_healthy",
            AlertRule::FusionConfirmed => "fusion_confirmed",
            AlertRule::FungalRisk => "fungal_risk",
            AlertRule::TreatmentUnprofitable => "treatment_unprofitable",
            AlertRule::DroughtStress => "drought_stress",
            AlertRule::Waterlogging => "waterlogging",
            AlertRule::HeatStress => "heat_stress",
            AlertRule::SensorInvalid => "sensor_invalid",
            AlertRule::SensorStale => "sensor_stale",
            AlertRule::SensorMissing => "sensor_missing",
        }
    }

    pub fn alert_type(&self) -> AlertType {
        match self {
            AlertRule::DiseaseCritical | AlertRule::FusionConfirmed => AlertType::Critical,
            AlertRule::DiseaseWarning
            | AlertRule::FungalRisk
            | AlertRule::TreatmentUnprofitable
            | AlertRule::DroughtStress
            | AlertRule::Waterlogging
            | AlertRule::HeatStress
            | AlertRule::SensorInvalid => AlertType::Warning,
            AlertRule::DiseaseDetected
            | AlertRule::FieldHealthy
            | AlertRule::SensorStale
            | AlertRule::SensorMissing => AlertType::Info,
        }
    }

    pub fn group(&self) -> ConflictGroup {
        match self {
            AlertRule::DiseaseCritical
            | AlertRule::DiseaseWarning
            | AlertRule::DiseaseDetected
            | AlertRule::FieldHealthy
            | AlertRule::FusionConfirmed
            | AlertRule::FungalRisk => ConflictGroup::Infection,
            AlertRule::TreatmentUnprofitable => ConflictGroup::Economics,
            AlertRule::DroughtStress | AlertRule::Waterlogging => ConflictGroup::Moisture,
            AlertRule::HeatStress => ConflictGroup::Climate,
            AlertRule::SensorInvalid | AlertRule::SensorStale | AlertRule::SensorMissing => {
                ConflictGroup::Sensor
            }
        }
    }

    /// Position in `ALERT_RULES`
    pub fn order(&self) -> usize {
        ALERT_RULES
            .iter()
            .position(|r| r == self)
            .unwrap_or(ALERT_RULES.len())
    }

    pub fn from_id(id: &str) -> Option<AlertRule> {
        ALERT_RULES.iter().copied().find(|r| r.id() == id)
    }

    /// Candidate alert when the rule fires on these signals
    pub fn evaluate(&self, s: &AlertSignals, t: &AlertConfig) -> Option<AlertCandidate> {
        let pct = s.infection_percentage;
        let roi = s.roi_percentage.unwrap_or(Decimal::ZERO);

        let (entity, title, message, action, signals): (String, String, String, String, Vec<&str>) =
            match self {
                AlertRule::DiseaseCritical => {
                    if !(s.has_infection
                        && pct >= t.critical_infection_percentage
                        && roi > Decimal::ZERO)
                    {
                        return None;
                    }
                    (
                        "field".into(),
                        "Severe infection: spray now".into(),
                        format!(
                            "{:.1}% of the field is infected across {} zones; precision treatment returns {}% ROI",
                            pct, s.infected_cells, roi
                        ),
                        "Launch the precision spray mission on infected zones immediately".into(),
                        vec!["infection_percentage", "roi_percentage"],
                    )
                }
                AlertRule::DiseaseWarning => {
                    if !(s.has_infection && pct >= t.warning_infection_percentage) {
                        return None;
                    }
                    (
                        "field".into(),
                        "Spreading infection".into(),
                        format!(
                            "{:.1}% of the field is infected across {} zones",
                            pct, s.infected_cells
                        ),
                        "Plan a precision spray within 48 hours".into(),
                        vec!["infection_percentage"],
                    )
                }
                AlertRule::DiseaseDetected => {
                    if !s.has_infection {
                        return None;
                    }
                    (
                        "field".into(),
                        "Disease detected".into(),
                        format!(
                            "{} zone(s) show disease ({:.1}% of the field)",
                            s.infected_cells, pct
                        ),
                        "Monitor affected zones on the next flight".into(),
                        vec!["infected_cells"],
                    )
                }
                AlertRule::FieldHealthy => {
                    if s.has_infection || s.total_detections == 0 {
                        return None;
                    }
                    (
                        "field".into(),
                        "Field healthy".into(),
                        format!("{} detections, no disease found", s.total_detections),
                        "Continue routine monitoring".into(),
                        vec!["total_detections"],
                    )
                }
                AlertRule::FusionConfirmed => {
                    let d = s.fusion_diagnosis.as_ref()?;
                    if !(d.is_matched()
                        && d.severity == DiagnosisSeverity::High
                        && d.confidence >= t.fusion_confidence_threshold)
                    {
                        return None;
                    }
                    (
                        d.rule_id.clone(),
                        format!("Confirmed: {}", d.refined_diagnosis),
                        format!(
                            "Vision and sensors agree on {} ({:.0}% confidence)",
                            d.refined_diagnosis.to_lowercase(),
                            d.confidence * 100.0
                        ),
                        d.action.clone(),
                        vec!["fusion_diagnosis"],
                    )
                }
                AlertRule::FungalRisk => {
                    let humidity = s.air_humidity?;
                    let temp = s.air_temperature?;
                    if !(humidity >= t.fungal_humidity_percentage
                        && temp >= t.fungal_min_temperature_c
                        && temp <= t.fungal_max_temperature_c)
                    {
                        return None;
                    }
                    (
                        "field".into(),
                        "Fungal outbreak risk".into(),
                        format!(
                            "Humidity {:.0}% at {:.1} °C favours fungal spread",
                            humidity, temp
                        ),
                        "Inspect lower canopy and prepare preventive fungicide".into(),
                        vec!["air_humidity", "air_temperature"],
                    )
                }
                AlertRule::TreatmentUnprofitable => {
                    if !(s.has_infection && roi < Decimal::ZERO) {
                        return None;
                    }
                    (
                        "field".into(),
                        "Treatment not cost-effective".into(),
                        format!(
                            "Spraying costs more than it protects (ROI {}%, net {})",
                            roi,
                            s.net_benefit.unwrap_or(Decimal::ZERO).round_dp(2)
                        ),
                        "Re-check crop price and cost inputs before spraying".into(),
                        vec!["roi_percentage", "net_benefit"],
                    )
                }
                AlertRule::DroughtStress => {
                    let moisture = s.soil_moisture?;
                    if moisture >= t.dry_soil_moisture_percentage {
                        return None;
                    }
                    (
                        "field".into(),
                        "Soil too dry".into(),
                        format!("Soil moisture at {:.0}%", moisture),
                        "Irrigate before any chemical application".into(),
                        vec!["soil_moisture"],
                    )
                }
                AlertRule::Waterlogging => {
                    let moisture = s.soil_moisture?;
                    if moisture <= t.waterlogged_soil_moisture_percentage {
                        return None;
                    }
                    (
                        "field".into(),
                        "Waterlogged soil".into(),
                        format!("Soil moisture at {:.0}%", moisture),
                        "Pause irrigation and check drainage".into(),
                        vec!["soil_moisture"],
                    )
                }
                AlertRule::HeatStress => {
                    let temp = s.air_temperature?;
                    if temp < t.heat_stress_temperature_c {
                        return None;
                    }
                    (
                        "field".into(),
                        "Heat stress".into(),
                        format!("Air temperature at {:.1} °C", temp),
                        "Avoid midday spraying; irrigate in the early morning".into(),
                        vec!["air_temperature"],
                    )
                }
                AlertRule::SensorInvalid => {
                    if !s.sensor_invalid {
                        return None;
                    }
                    (
                        "sensor".into(),
                        "Sensor reading rejected".into(),
                        "Latest sensor reading is out of range; diagnoses use vision only".into(),
                        "Check the field sensor node".into(),
                        vec!["sensor_invalid"],
                    )
                }
                AlertRule::SensorStale => {
                    if !s.sensor_stale {
                        return None;
                    }
                    (
                        "sensor".into(),
                        "Sensor data stale".into(),
                        "Latest sensor reading is older than the freshness limit".into(),
                        "Check sensor connectivity".into(),
                        vec!["sensor_stale"],
                    )
                }
                AlertRule::SensorMissing => {
                    if !s.sensor_missing {
                        return None;
                    }
                    (
                        "sensor".into(),
                        "No sensor data".into(),
                        "No sensor reading received; diagnoses use vision only".into(),
                        "Connect the field sensor node".into(),
                        vec!["sensor_missing"],
                    )
                }
            };

        Some(AlertCandidate {
            rule: *self,
            id: format!("{}:{}", self.id(), entity),
            title,
            message,
            action,
            metadata: s.metadata(),
            signals: signals.into_iter().map(String::from).collect(),
        })
    }
}

/// A fired rule before debouncing turns it into an `Alert`
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub rule: AlertRule,
    pub id: String,
    pub title: String,
    pub message: String,
    pub action: String,
    pub metadata: AlertMetadata,
    pub signals: Vec<String>,
}

impl AlertCandidate {
    pub fn alert_type(&self) -> AlertType {
        self.rule.alert_type()
    }

    fn into_alert(self, timestamp: DateTime<Utc>) -> Alert {
        Alert {
            id: self.id,
            rule_id: self.rule.id().to_string(),
            alert_type: self.rule.alert_type(),
            title: self.title,
            message: self.message,
            action: self.action,
            metadata: self.metadata,
            signals: self.signals,
            timestamp,
            acknowledged: false,
            acknowledged_at: None,
            scheduled_for: None,
            expired_at: None,
        }
    }
}

/// Every rule that fires, in table order
pub fn evaluate_alerts(signals: &AlertSignals, thresholds: &AlertConfig) -> Vec<AlertCandidate> {
    ALERT_RULES
        .iter()
        .filter_map(|rule| rule.evaluate(signals, thresholds))
        .collect()
}

/// Drop candidates outranked by a more severe one in the same group.
///
/// Equal-severity candidates all survive; disjoint groups are never touched.
pub fn resolve_conflicts(candidates: Vec<AlertCandidate>) -> Vec<AlertCandidate> {
    let mut top: HashMap<ConflictGroup, AlertType> = HashMap::new();
    for candidate in &candidates {
        let level = top.entry(candidate.rule.group()).or_insert(candidate.alert_type());
        *level = (*level).max(candidate.alert_type());
    }

    candidates
        .into_iter()
        .filter(|c| top.get(&c.rule.group()) == Some(&c.alert_type()))
        .collect()
}

// ============================================================================
// Alert service
// ============================================================================

/// Outcome of one refresh tick
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AlertRefresh {
    /// CRITICAL first, then rule order
    pub active: Vec<Alert>,
    /// Ids of alerts raised fresh this tick
    pub raised: Vec<String>,
    /// Ids that re-fired inside the debounce window and reused the earlier instance
    pub suppressed: Vec<String>,
}

/// Session-scoped alert state: active set, history and debounce clock
#[derive(Debug, Clone)]
pub struct AlertService {
    thresholds: AlertConfig,
    sensor_max_age: Duration,
    debounce_window: Duration,
    active: Vec<Alert>,
    history: Vec<Alert>,
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl AlertService {
    pub fn new(thresholds: AlertConfig, sensor_max_age: Duration) -> Self {
        let debounce_window = Duration::seconds(thresholds.debounce_window_seconds);
        Self {
            thresholds,
            sensor_max_age,
            debounce_window,
            active: Vec::new(),
            history: Vec::new(),
            last_seen: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.alerts.clone(),
            Duration::seconds(config.fusion.sensor_max_age_seconds),
        )
    }

    pub fn thresholds(&self) -> &AlertConfig {
        &self.thresholds
    }

    pub fn sensor_max_age(&self) -> Duration {
        self.sensor_max_age
    }

    /// Forget everything; called when a new mission starts
    pub fn reset(&mut self) {
        self.active.clear();
        self.history.clear();
        self.last_seen.clear();
    }

    pub fn active(&self) -> &[Alert] {
        &self.active
    }

    /// Alerts that left the active set, oldest first
    pub fn history(&self) -> &[Alert] {
        &self.history
    }

    /// Alert ids still inside their debounce window
    pub fn debounce_entries(&self) -> usize {
        self.last_seen.len()
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.active.iter().find(|a| a.id == id)
    }

    /// Evaluate, resolve and debounce one tick's signals
    pub fn refresh(&mut self, signals: &AlertSignals, now: DateTime<Utc>) -> AlertRefresh {
        let candidates = resolve_conflicts(evaluate_alerts(signals, &self.thresholds));

        let mut previous = std::mem::take(&mut self.active);
        let mut next = Vec::with_capacity(candidates.len());
        let mut raised = Vec::new();
        let mut suppressed = Vec::new();

        for candidate in candidates {
            let id = candidate.id.clone();

            let carried = if let Some(pos) = previous.iter().position(|a| a.id == id) {
                Some(previous.swap_remove(pos))
            } else if self.within_debounce(&id, now) {
                self.revive(&id)
            } else {
                None
            };

            let alert = match carried {
                Some(mut existing) => {
                    if existing.expired_at.take().is_some() {
                        tracing::debug!(alert_id = %id, "Duplicate alert suppressed by debounce");
                        suppressed.push(id.clone());
                    }
                    existing.title = candidate.title;
                    existing.message = candidate.message;
                    existing.action = candidate.action;
                    existing.metadata = candidate.metadata;
                    existing.signals = candidate.signals;
                    existing
                }
                None => {
                    let alert = candidate.into_alert(now);
                    tracing::info!(
                        alert_id = %alert.id,
                        alert_type = %alert.alert_type,
                        title = %alert.title,
                        "Alert raised"
                    );
                    raised.push(id.clone());
                    alert
                }
            };

            self.last_seen.insert(id, now);
            next.push(alert);
        }

        // Whatever did not fire again leaves the active set
        for mut gone in previous {
            tracing::info!(alert_id = %gone.id, "Alert expired");
            gone.expired_at = Some(now);
            self.history.push(gone);
        }

        let window = self.debounce_window;
        self.last_seen.retain(|_, seen| now - *seen <= window);

        next.sort_by_key(|a| {
            let order = AlertRule::from_id(&a.rule_id)
                .map(|r| r.order())
                .unwrap_or(usize::MAX);
            (std::cmp::Reverse(a.alert_type), order)
        });
        self.active = next;

        AlertRefresh {
            active: self.active.clone(),
            raised,
            suppressed,
        }
    }

    /// Mark an active alert acknowledged; no-op if it already is
    pub fn acknowledge(&mut self, id: &str, now: DateTime<Utc>) -> PipelineResult<Alert> {
        let alert = self
            .active
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PipelineError::AlertNotFound(id.to_string()))?;

        if !alert.acknowledged {
            alert.acknowledged = true;
            alert.acknowledged_at = Some(now);
            tracing::info!(alert_id = %id, "Alert acknowledged");
        }

        Ok(alert.clone())
    }

    /// Commit a treatment time to an acknowledged, non-INFO alert
    pub fn schedule(
        &mut self,
        id: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PipelineResult<Alert> {
        let alert = self
            .active
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PipelineError::AlertNotFound(id.to_string()))?;

        if alert.alert_type == AlertType::Info {
            return Err(PipelineError::InvalidStateTransition(format!(
                "INFO alert {} cannot be scheduled",
                id
            )));
        }
        if !alert.acknowledged {
            return Err(PipelineError::InvalidStateTransition(format!(
                "alert {} must be acknowledged before scheduling",
                id
            )));
        }
        if at < now {
            return Err(PipelineError::InvalidStateTransition(format!(
                "scheduled time {} is in the past",
                at.to_rfc3339()
            )));
        }

        alert.scheduled_for = Some(at);
        tracing::info!(alert_id = %id, scheduled_for = %at, "Treatment scheduled");

        Ok(alert.clone())
    }

    fn within_debounce(&self, id: &str, now: DateTime<Utc>) -> bool {
        self.last_seen
            .get(id)
            .map(|seen| now - *seen <= self.debounce_window)
            .unwrap_or(false)
    }

    /// Pull the most recent expired instance of `id` back out of history
    fn revive(&mut self, id: &str) -> Option<Alert> {
        let pos = self.history.iter().rposition(|a| a.id == id)?;
        Some(self.history.remove(pos))
    }
}
