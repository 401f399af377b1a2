//! Field zone grid models

use serde::{Deserialize, Serialize};

use crate::types::{GeoBounds, GpsCoordinates};

/// Infection severity of a single grid cell
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum CellSeverity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl CellSeverity {
    /// 0 → none, 1 → low, 2-3 → medium, 4+ → high
    pub fn from_infected_detections(count: u32) -> Self {
        match count {
            0 => CellSeverity::None,
            1 => CellSeverity::Low,
            2..=3 => CellSeverity::Medium,
            _ => CellSeverity::High,
        }
    }
}

/// One rectangular zone of the field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridCell {
    /// Column index, west → east
    pub x: usize,
    /// Row index, south → north
    pub y: usize,
    pub bounds: GeoBounds,
    pub detection_count: u32,
    /// Detections whose top label is a disease
    pub infected_detections: u32,
    pub infected: bool,
    pub severity: CellSeverity,
    /// Most frequent disease label in the cell (alphabetical on ties)
    pub dominant_label: Option<String>,
}

impl GridCell {
    pub fn empty(x: usize, y: usize, bounds: GeoBounds) -> Self {
        Self {
            x,
            y,
            bounds,
            detection_count: 0,
            infected_detections: 0,
            infected: false,
            severity: CellSeverity::None,
            dominant_label: None,
        }
    }

    /// Stable identifier, e.g. "3-7" for column 3, row 7
    pub fn cell_id(&self) -> String {
        format!("{}-{}", self.x, self.y)
    }

    pub fn centroid(&self) -> GpsCoordinates {
        self.bounds.centroid()
    }
}

/// Fixed-resolution partition of the field bounding box.
///
/// `cells[y][x]`; row 0 is the southern edge, column 0 the western edge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneGrid {
    pub resolution: usize,
    pub bounds: GeoBounds,
    pub cells: Vec<Vec<GridCell>>,
}

impl ZoneGrid {
    pub fn cell(&self, x: usize, y: usize) -> Option<&GridCell> {
        self.cells.get(y).and_then(|row| row.get(x))
    }

    pub fn iter_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().flatten()
    }

    pub fn infected_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.iter_cells().filter(|c| c.infected)
    }
}

/// Aggregate statistics, always derived from a freshly built grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridStats {
    pub resolution: usize,
    pub total_cells: usize,
    pub infected_count: usize,
    pub infected_percentage: f64,
    pub chemical_savings_percentage: f64,
    /// Detections binned into the grid
    pub total_detections: u32,
    /// Detections quarantined for missing or unusable GPS
    pub excluded_detections: u32,
    pub affected_cells: Vec<GridCell>,
}

impl GridStats {
    pub fn has_infection(&self) -> bool {
        self.infected_count > 0
    }

    pub fn is_fully_infected(&self) -> bool {
        self.total_cells > 0 && self.infected_count == self.total_cells
    }
}
