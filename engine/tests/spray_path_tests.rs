//! Spray path planner tests
//!
//! Covers:
//! - No path when nothing is infected
//! - Serpentine ordering and start/end corners
//! - Distance and time estimates
//! - Full coverage and determinism over random infected sets

use std::collections::BTreeSet;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use agridrone_engine::config::PathEndPoint;
use agridrone_engine::services::spray_path::path_distance;
use agridrone_engine::services::{SprayPathService, ZoneGridService};
use agridrone_engine::Config;
use shared::{Classification, Detection, ZoneGrid};

fn grid_with_infected(cells: &[(usize, usize)]) -> ZoneGrid {
    let service = ZoneGridService::from_config(&Config::default());
    let empty = service.empty_grid();
    let detections: Vec<Detection> = cells
        .iter()
        .enumerate()
        .map(|(i, (x, y))| Detection {
            id: format!("d{}", i),
            frame_id: i as u64,
            timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap(),
            gps: Some(empty.cell(*x, *y).unwrap().centroid()),
            classifications: vec![Classification::new("Tomato_Early_blight", 0.9)],
        })
        .collect();
    service.build(&detections).0
}

fn planner() -> SprayPathService {
    SprayPathService::from_config(&Config::default())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_no_infection_no_path() {
        let path = planner().plan(&grid_with_infected(&[]));

        assert!(!path.path_exists);
        assert!(path.start_point.is_none());
        assert!(path.end_point.is_none());
        assert!(path.waypoints.is_empty());
        assert!(path.total_distance_meters.is_none());
        assert!(path.estimated_time_seconds.is_none());
    }

    #[test]
    fn test_two_waypoints_plus_start_and_end() {
        let grid = grid_with_infected(&[(2, 3), (2, 3), (7, 8)]);
        let path = planner().plan(&grid);

        assert!(path.path_exists);
        assert_eq!(path.waypoints.len(), 2);
        assert_eq!(path.points().len(), 4);
        assert_eq!(path.start_point, Some(grid.bounds.south_west()));
        assert_eq!(path.end_point, Some(grid.bounds.north_east()));
        assert_eq!(path.waypoints[0].cell_id, "2-3");
        assert_eq!(path.waypoints[0].detection_count, 2);
        assert_eq!(path.waypoints[1].cell_id, "7-8");
    }

    #[test]
    fn test_serpentine_alternates_direction() {
        let grid = grid_with_infected(&[(5, 0), (1, 0), (2, 1), (6, 1), (0, 2)]);
        let path = planner().plan(&grid);
        let order: Vec<&str> = path.waypoints.iter().map(|w| w.cell_id.as_str()).collect();

        assert_eq!(order, vec!["1-0", "5-0", "6-1", "2-1", "0-2"]);
    }

    #[test]
    fn test_distance_and_time() {
        let grid = grid_with_infected(&[(4, 4), (5, 6)]);
        let path = planner().plan(&grid);

        let distance = path.total_distance_meters.unwrap();
        assert!((distance - path_distance(&path.points())).abs() < 1e-9);
        // Never shorter than the straight corner-to-corner diagonal (~224 m)
        let diagonal = grid.bounds.south_west().distance_to(&grid.bounds.north_east());
        assert!(distance >= diagonal - 1e-6);

        let expected_time = distance / 5.0 + 2.0 * 3.0;
        assert!((path.estimated_time_seconds.unwrap() - expected_time).abs() < 1e-9);
    }

    #[test]
    fn test_return_to_start() {
        let mut config = Config::default();
        config.drone.end_point = PathEndPoint::ReturnToStart;
        let grid = grid_with_infected(&[(9, 9)]);
        let path = SprayPathService::from_config(&config).plan(&grid);

        assert_eq!(path.end_point, path.start_point);
        let sw = grid.bounds.south_west();
        let centroid = path.waypoints[0].position;
        let expected = 2.0 * sw.distance_to(&centroid);
        assert!((path.total_distance_meters.unwrap() - expected).abs() < 1e-6);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn cell_set_strategy() -> impl Strategy<Value = BTreeSet<(usize, usize)>> {
        prop::collection::btree_set((0usize..10, 0usize..10), 1..40)
    }

    proptest! {
        /// Every infected cell appears exactly once in the route
        #[test]
        fn test_full_coverage(cells in cell_set_strategy()) {
            let list: Vec<(usize, usize)> = cells.iter().copied().collect();
            let path = planner().plan(&grid_with_infected(&list));

            prop_assert!(path.path_exists);
            prop_assert_eq!(path.waypoints.len(), cells.len());
            let visited: BTreeSet<(usize, usize)> = path.waypoints.iter().map(|w| (w.x, w.y)).collect();
            prop_assert_eq!(visited, cells);
        }

        /// Identical infected sets give identical routes regardless of input order
        #[test]
        fn test_route_is_deterministic(cells in cell_set_strategy()) {
            let forward: Vec<(usize, usize)> = cells.iter().copied().collect();
            let backward: Vec<(usize, usize)> = cells.iter().rev().copied().collect();

            let a = planner().plan(&grid_with_infected(&forward));
            let b = planner().plan(&grid_with_infected(&backward));
            let ids_a: Vec<String> = a.waypoints.iter().map(|w| w.cell_id.clone()).collect();
            let ids_b: Vec<String> = b.waypoints.iter().map(|w| w.cell_id.clone()).collect();

            prop_assert_eq!(ids_a, ids_b);
            prop_assert_eq!(a.total_distance_meters, b.total_distance_meters);
        }
    }
}
