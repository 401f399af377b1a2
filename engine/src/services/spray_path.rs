//! Spray path planning
//!
//! Orders infected cells with a serpentine sweep: rows run south to north,
//! even rows west to east, odd rows east to west. The order depends only on
//! the infected cell set, so repeated plans are identical.

use shared::{GpsCoordinates, SprayPath, Waypoint, ZoneGrid};

use crate::config::{Config, PathEndPoint};

/// Route planner for the spray drone
#[derive(Debug, Clone)]
pub struct SprayPathService {
    cruise_speed_mps: f64,
    dwell_seconds_per_waypoint: f64,
    end_point: PathEndPoint,
}

impl SprayPathService {
    pub fn new(cruise_speed_mps: f64, dwell_seconds_per_waypoint: f64, end_point: PathEndPoint) -> Self {
        Self {
            cruise_speed_mps,
            dwell_seconds_per_waypoint,
            end_point,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.drone.cruise_speed_mps,
            config.drone.dwell_seconds_per_waypoint,
            config.drone.end_point,
        )
    }

    pub fn plan(&self, grid: &ZoneGrid) -> SprayPath {
        let waypoints = serpentine_waypoints(grid);
        if waypoints.is_empty() {
            return SprayPath::none();
        }

        let start = grid.bounds.south_west();
        let end = match self.end_point {
            PathEndPoint::OppositeCorner => grid.bounds.north_east(),
            PathEndPoint::ReturnToStart => start,
        };

        let points: Vec<GpsCoordinates> = std::iter::once(start)
            .chain(waypoints.iter().map(|w| w.position))
            .chain(std::iter::once(end))
            .collect();
        let total_distance = path_distance(&points);

        let estimated_time = total_distance / self.cruise_speed_mps
            + waypoints.len() as f64 * self.dwell_seconds_per_waypoint;

        tracing::debug!(
            waypoints = waypoints.len(),
            distance_m = total_distance,
            time_s = estimated_time,
            "Spray path planned"
        );

        SprayPath {
            path_exists: true,
            start_point: Some(start),
            waypoints,
            end_point: Some(end),
            total_distance_meters: Some(total_distance),
            estimated_time_seconds: Some(estimated_time),
        }
    }
}

/// Infected cells in sweep order
pub fn serpentine_waypoints(grid: &ZoneGrid) -> Vec<Waypoint> {
    let mut waypoints = Vec::new();

    for (y, row) in grid.cells.iter().enumerate() {
        let infected = row.iter().filter(|c| c.infected);
        let ordered: Vec<_> = if y % 2 == 0 {
            infected.collect()
        } else {
            infected.rev().collect()
        };

        waypoints.extend(ordered.into_iter().map(|cell| Waypoint {
            cell_id: cell.cell_id(),
            x: cell.x,
            y: cell.y,
            position: cell.centroid(),
            detection_count: cell.detection_count,
        }));
    }

    waypoints
}

/// Sum of haversine legs between consecutive points
pub fn path_distance(points: &[GpsCoordinates]) -> f64 {
    points.windows(2).map(|leg| leg[0].distance_to(&leg[1])).sum()
}
