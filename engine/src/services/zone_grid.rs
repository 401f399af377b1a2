//! Zone grid mapping
//!
//! Bins geotagged detections into a fixed N×N partition of the field
//! bounding box and derives the aggregate statistics from the fresh grid.

use std::collections::BTreeMap;

use shared::validation::validate_spatial_detection;
use shared::{
    CellSeverity, Detection, GeoBounds, GpsCoordinates, GridCell, GridStats, ZoneGrid,
};

use crate::config::Config;

/// Grid mapper for one field; bounds are derived once at construction
#[derive(Debug, Clone)]
pub struct ZoneGridService {
    bounds: GeoBounds,
    resolution: usize,
}

impl ZoneGridService {
    /// A zero resolution is raised to a single cell
    pub fn new(bounds: GeoBounds, resolution: usize) -> Self {
        Self {
            bounds,
            resolution: resolution.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.field.bounds(), config.grid.resolution)
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Cell indices `(x, y)` for a point; outside points clamp to the nearest edge cell
    pub fn locate(&self, point: &GpsCoordinates) -> (usize, usize) {
        let x = axis_index(
            point.longitude,
            self.bounds.lng_min,
            self.bounds.lng_span(),
            self.resolution,
        );
        let y = axis_index(
            point.latitude,
            self.bounds.lat_min,
            self.bounds.lat_span(),
            self.resolution,
        );
        (x, y)
    }

    /// Empty grid covering the field
    pub fn empty_grid(&self) -> ZoneGrid {
        let n = self.resolution;
        let lat_step = self.bounds.lat_span() / n as f64;
        let lng_step = self.bounds.lng_span() / n as f64;

        let cells = (0..n)
            .map(|y| {
                (0..n)
                    .map(|x| {
                        let bounds = GeoBounds {
                            lat_min: self.bounds.lat_min + lat_step * y as f64,
                            lat_max: self.bounds.lat_min + lat_step * (y + 1) as f64,
                            lng_min: self.bounds.lng_min + lng_step * x as f64,
                            lng_max: self.bounds.lng_min + lng_step * (x + 1) as f64,
                        };
                        GridCell::empty(x, y, bounds)
                    })
                    .collect()
            })
            .collect();

        ZoneGrid {
            resolution: n,
            bounds: self.bounds,
            cells,
        }
    }

    /// Bin detections into a fresh grid and compute its statistics.
    ///
    /// Detections without a usable GPS fix are quarantined and counted in
    /// `excluded_detections`; they never fail the build.
    pub fn build(&self, detections: &[Detection]) -> (ZoneGrid, GridStats) {
        let mut grid = self.empty_grid();
        let mut labels: BTreeMap<(usize, usize), BTreeMap<String, u32>> = BTreeMap::new();
        let mut excluded = 0u32;

        for detection in detections {
            let fix = validate_spatial_detection(detection)
                .and(detection.gps.ok_or("Detection has no GPS fix"));
            let position = match fix {
                Ok(position) => position,
                Err(reason) => {
                    tracing::warn!(
                        detection_id = %detection.id,
                        frame_id = detection.frame_id,
                        reason,
                        "Detection excluded from grid"
                    );
                    excluded += 1;
                    continue;
                }
            };

            let (x, y) = self.locate(&position);
            let cell = &mut grid.cells[y][x];
            cell.detection_count += 1;

            if detection.is_infected() {
                cell.infected_detections += 1;
                cell.infected = true;
                if let Some(top) = detection.top_classification() {
                    *labels
                        .entry((x, y))
                        .or_default()
                        .entry(top.label.clone())
                        .or_insert(0) += 1;
                }
            }
        }

        for row in grid.cells.iter_mut() {
            for cell in row.iter_mut() {
                cell.severity = CellSeverity::from_infected_detections(cell.infected_detections);
                cell.dominant_label = labels.get(&(cell.x, cell.y)).and_then(dominant_label);
            }
        }

        let stats = compute_stats(&grid, excluded);
        tracing::debug!(
            infected = stats.infected_count,
            total = stats.total_cells,
            binned = stats.total_detections,
            excluded = stats.excluded_detections,
            "Zone grid rebuilt"
        );

        (grid, stats)
    }
}

/// Single pass over the grid
pub fn compute_stats(grid: &ZoneGrid, excluded_detections: u32) -> GridStats {
    let total_cells = grid.resolution * grid.resolution;
    let affected_cells: Vec<GridCell> = grid.infected_cells().cloned().collect();
    let infected_count = affected_cells.len();
    let total_detections = grid.iter_cells().map(|c| c.detection_count).sum();

    let infected_percentage = if total_cells == 0 {
        0.0
    } else {
        infected_count as f64 / total_cells as f64 * 100.0
    };

    GridStats {
        resolution: grid.resolution,
        total_cells,
        infected_count,
        infected_percentage,
        chemical_savings_percentage: 100.0 - infected_percentage,
        total_detections,
        excluded_detections,
        affected_cells,
    }
}

fn axis_index(value: f64, min: f64, span: f64, n: usize) -> usize {
    if n == 0 || span <= 0.0 {
        return 0;
    }
    let raw = ((value - min) / span * n as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(n - 1)
    }
}

/// Most frequent label; alphabetical order breaks ties
fn dominant_label(counts: &BTreeMap<String, u32>) -> Option<String> {
    let mut best: Option<(&String, u32)> = None;
    for (label, &count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }
    best.map(|(label, _)| label.clone())
}
