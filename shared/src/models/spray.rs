//! Drone spray route models

use serde::{Deserialize, Serialize};

use crate::types::GpsCoordinates;

/// One stop on the spray route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    pub cell_id: String,
    pub x: usize,
    pub y: usize,
    /// Cell centroid
    pub position: GpsCoordinates,
    /// Drives per-waypoint dosage downstream
    pub detection_count: u32,
}

/// Treatment route over the infected cells.
///
/// When nothing is infected `path_exists` is false and every other field
/// is empty/None.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SprayPath {
    pub path_exists: bool,
    pub start_point: Option<GpsCoordinates>,
    pub waypoints: Vec<Waypoint>,
    pub end_point: Option<GpsCoordinates>,
    pub total_distance_meters: Option<f64>,
    pub estimated_time_seconds: Option<f64>,
}

impl SprayPath {
    pub fn none() -> Self {
        Self {
            path_exists: false,
            start_point: None,
            waypoints: Vec::new(),
            end_point: None,
            total_distance_meters: None,
            estimated_time_seconds: None,
        }
    }

    /// Start, every waypoint centroid, then end
    pub fn points(&self) -> Vec<GpsCoordinates> {
        self.start_point
            .into_iter()
            .chain(self.waypoints.iter().map(|w| w.position))
            .chain(self.end_point)
            .collect()
    }
}
