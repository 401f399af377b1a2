//! Mission session orchestration
//!
//! Owns every piece of session-scoped state (detections, GPS pins, latest
//! reading, alert state) and runs Grid → Economics → Path → Fusion → Alerts
//! synchronously on each refresh tick. Ticks must be serialised by the
//! caller; nothing here is shared across threads.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    Alert, AlertType, Detection, GpsCoordinates, MissionStatus, MissionSummary,
    PipelineSnapshot, SensorReading,
};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::services::alerts::{extract_signals, AlertService};
use crate::services::economics::EconomicImpactService;
use crate::services::fusion::FusionService;
use crate::services::spray_path::SprayPathService;
use crate::services::zone_grid::ZoneGridService;

/// Operator input applied after a tick's alerts are refreshed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAction {
    Acknowledge(String),
    Schedule { id: String, at: DateTime<Utc> },
}

/// Everything the upstream collaborators delivered for one refresh tick.
///
/// Detection polls are cumulative; re-delivered ids are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickInput {
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub sensor: Option<SensorReading>,
    #[serde(default)]
    pub operator: Vec<OperatorAction>,
}

/// One drone mission and its decision pipeline
#[derive(Debug, Clone)]
pub struct MissionService {
    grid: ZoneGridService,
    economics: EconomicImpactService,
    spray: SprayPathService,
    fusion: FusionService,
    alerts: AlertService,

    mission_id: Uuid,
    status: MissionStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    gps_pins: HashMap<u64, GpsCoordinates>,
    detections: Vec<Detection>,
    detection_ids: HashSet<String>,
    latest_reading: Option<SensorReading>,
}

impl MissionService {
    /// Validate the configuration and open a first mission.
    ///
    /// An invalid configuration is fatal; nothing is computed.
    pub fn new(config: &Config, now: DateTime<Utc>) -> PipelineResult<Self> {
        config.validate()?;

        let mut service = Self {
            grid: ZoneGridService::from_config(config),
            economics: EconomicImpactService::from_config(config),
            spray: SprayPathService::from_config(config),
            fusion: FusionService::from_config(config),
            alerts: AlertService::from_config(config),
            mission_id: Uuid::nil(),
            status: MissionStatus::Completed,
            started_at: now,
            ended_at: None,
            gps_pins: HashMap::new(),
            detections: Vec::new(),
            detection_ids: HashSet::new(),
            latest_reading: None,
        };
        service.start_mission(now);

        Ok(service)
    }

    /// Reset all session state under a fresh mission id
    pub fn start_mission(&mut self, now: DateTime<Utc>) -> Uuid {
        self.mission_id = Uuid::new_v4();
        self.status = MissionStatus::Active;
        self.started_at = now;
        self.ended_at = None;
        self.gps_pins.clear();
        self.detections.clear();
        self.detection_ids.clear();
        self.latest_reading = None;
        self.alerts.reset();

        tracing::info!(mission_id = %self.mission_id, "Mission started");
        self.mission_id
    }

    pub fn end_mission(&mut self, now: DateTime<Utc>) -> PipelineResult<()> {
        if self.status == MissionStatus::Completed {
            return Err(PipelineError::InvalidStateTransition(format!(
                "mission {} is already completed",
                self.mission_id
            )));
        }
        self.status = MissionStatus::Completed;
        self.ended_at = Some(now);

        tracing::info!(
            mission_id = %self.mission_id,
            detections = self.detections.len(),
            "Mission completed"
        );
        Ok(())
    }

    pub fn mission_id(&self) -> Uuid {
        self.mission_id
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn latest_reading(&self) -> Option<&SensorReading> {
        self.latest_reading.as_ref()
    }

    pub fn alerts(&self) -> &AlertService {
        &self.alerts
    }

    /// Merge new detections and the sensor reading into session state.
    ///
    /// Completed missions accept nothing further.
    pub fn ingest(&mut self, detections: Vec<Detection>, sensor: Option<SensorReading>) {
        if self.status == MissionStatus::Completed {
            tracing::warn!(mission_id = %self.mission_id, "Ignoring input for completed mission");
            return;
        }

        for mut detection in detections {
            if !self.detection_ids.insert(detection.id.clone()) {
                continue;
            }

            match self.gps_pins.get(&detection.frame_id) {
                Some(pin) => detection.gps = Some(*pin),
                None => {
                    if let Some(position) = detection.position() {
                        self.gps_pins.insert(detection.frame_id, position);
                    }
                }
            }

            self.detections.push(detection);
        }

        if let Some(reading) = sensor {
            let newer = self
                .latest_reading
                .as_ref()
                .map(|current| reading.timestamp >= current.timestamp)
                .unwrap_or(true);
            if newer {
                self.latest_reading = Some(reading);
            }
        }
    }

    pub fn acknowledge(&mut self, id: &str, now: DateTime<Utc>) -> PipelineResult<Alert> {
        self.alerts.acknowledge(id, now)
    }

    pub fn schedule(
        &mut self,
        id: &str,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PipelineResult<Alert> {
        self.alerts.schedule(id, at, now)
    }

    pub fn apply(&mut self, action: &OperatorAction, now: DateTime<Utc>) -> PipelineResult<Alert> {
        match action {
            OperatorAction::Acknowledge(id) => self.acknowledge(id, now),
            OperatorAction::Schedule { id, at } => self.schedule(id, *at, now),
        }
    }

    /// Ingest one tick, run the whole pipeline and apply operator actions
    pub fn recompute(&mut self, tick: TickInput, now: DateTime<Utc>) -> PipelineSnapshot {
        let TickInput {
            detections,
            sensor,
            operator,
            ..
        } = tick;
        self.ingest(detections, sensor);

        let (grid, grid_stats) = self.grid.build(&self.detections);
        let economic_impact = self.economics.calculate(&grid_stats);
        let spray_path = self.spray.plan(&grid);

        let window = self.fusion.select_window(&self.detections);
        let reading = self.latest_reading.as_ref();
        let diagnoses = self.fusion.batch(window, reading, now);

        let signals = extract_signals(
            &grid_stats,
            &economic_impact,
            &diagnoses,
            reading,
            now,
            self.alerts.sensor_max_age(),
        );
        let refresh = self.alerts.refresh(&signals, now);
        tracing::debug!(
            active = refresh.active.len(),
            raised = refresh.raised.len(),
            suppressed = refresh.suppressed.len(),
            "Alerts refreshed"
        );

        for action in &operator {
            if let Err(e) = self.apply(action, now) {
                tracing::warn!(action = ?action, error = %e, "Operator action rejected");
            }
        }

        let summary = self.summary(grid_stats.excluded_detections, grid_stats.infected_count);

        PipelineSnapshot {
            computed_at: now,
            grid,
            grid_stats,
            spray_path,
            economic_impact,
            diagnoses,
            alerts: self.alerts.active().to_vec(),
            summary,
        }
    }

    fn summary(&self, excluded_detections: u32, infected_zones: usize) -> MissionSummary {
        let frames: BTreeSet<u64> = self.detections.iter().map(|d| d.frame_id).collect();
        let disease_types = self
            .detections
            .iter()
            .filter(|d| d.is_infected())
            .filter_map(|d| d.top_classification())
            .map(|c| c.label.clone())
            .collect();

        let count = |kind: AlertType| {
            self.alerts
                .active()
                .iter()
                .filter(|a| a.alert_type == kind)
                .count()
        };

        MissionSummary {
            mission_id: self.mission_id,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            frames_seen: frames.len(),
            total_detections: self.detections.len(),
            excluded_detections,
            infected_zones,
            disease_types,
            critical_alerts: count(AlertType::Critical),
            warning_alerts: count(AlertType::Warning),
            info_alerts: count(AlertType::Info),
        }
    }
}
