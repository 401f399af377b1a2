//! Mission session models

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::Alert;
use super::economics::EconomicImpact;
use super::fusion::FusionDiagnosis;
use super::grid::{GridStats, ZoneGrid};
use super::spray::SprayPath;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Active,
    Completed,
}

/// Project-state summary of one drone mission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionSummary {
    pub mission_id: Uuid,
    pub status: MissionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub frames_seen: usize,
    pub total_detections: usize,
    pub excluded_detections: u32,
    pub infected_zones: usize,
    pub disease_types: BTreeSet<String>,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub info_alerts: usize,
}

/// Everything one refresh tick hands to the rendering layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineSnapshot {
    pub computed_at: DateTime<Utc>,
    pub grid: ZoneGrid,
    pub grid_stats: GridStats,
    pub spray_path: SprayPath,
    pub economic_impact: EconomicImpact,
    pub diagnoses: Vec<FusionDiagnosis>,
    pub alerts: Vec<Alert>,
    pub summary: MissionSummary,
}
