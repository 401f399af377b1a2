//! Zone grid mapper tests
//!
//! Covers:
//! - Cell location, clamping and quarantine of unusable GPS
//! - Grid statistics and severity
//! - Grid conservation (every binned detection lands in exactly one cell)

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use agridrone_engine::services::zone_grid::compute_stats;
use agridrone_engine::services::ZoneGridService;
use agridrone_engine::Config;
use shared::{CellSeverity, Classification, Detection, GpsCoordinates};

fn grid_service() -> ZoneGridService {
    ZoneGridService::from_config(&Config::default())
}

fn detection_at(id: &str, frame_id: u64, gps: Option<GpsCoordinates>, label: &str) -> Detection {
    Detection {
        id: id.to_string(),
        frame_id,
        timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap(),
        gps,
        classifications: vec![Classification::new(label, 0.9)],
    }
}

fn centroid_of(service: &ZoneGridService, x: usize, y: usize) -> GpsCoordinates {
    service.empty_grid().cell(x, y).unwrap().centroid()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_healthy_grid() {
        let (grid, stats) = grid_service().build(&[]);

        assert_eq!(grid.resolution, 10);
        assert_eq!(grid.iter_cells().count(), 100);
        assert_eq!(stats.total_cells, 100);
        assert_eq!(stats.infected_count, 0);
        assert_eq!(stats.infected_percentage, 0.0);
        assert_eq!(stats.chemical_savings_percentage, 100.0);
        assert!(stats.affected_cells.is_empty());
        assert!(!stats.has_infection());
    }

    #[test]
    fn test_cells_tile_the_field() {
        let service = grid_service();
        let grid = service.empty_grid();
        let bounds = service.bounds();

        let sw = grid.cell(0, 0).unwrap();
        let ne = grid.cell(9, 9).unwrap();
        assert!((sw.bounds.lat_min - bounds.lat_min).abs() < 1e-12);
        assert!((sw.bounds.lng_min - bounds.lng_min).abs() < 1e-12);
        assert!((ne.bounds.lat_max - bounds.lat_max).abs() < 1e-9);
        assert!((ne.bounds.lng_max - bounds.lng_max).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_locates_back_to_its_cell() {
        let service = grid_service();
        for (x, y) in [(0, 0), (3, 7), (9, 9), (9, 0)] {
            let c = centroid_of(&service, x, y);
            assert_eq!(service.locate(&c), (x, y));
        }
    }

    #[test]
    fn test_outside_points_clamp_to_edge_cells() {
        let service = grid_service();
        let bounds = service.bounds();

        let far_south_west = GpsCoordinates::new(bounds.lat_min - 0.01, bounds.lng_min - 0.01);
        let far_north_east = GpsCoordinates::new(bounds.lat_max + 0.01, bounds.lng_max + 0.01);
        let exact_north_east = bounds.north_east();

        assert_eq!(service.locate(&far_south_west), (0, 0));
        assert_eq!(service.locate(&far_north_east), (9, 9));
        assert_eq!(service.locate(&exact_north_east), (9, 9));
    }

    #[test]
    fn test_clustered_detections_infect_one_cell() {
        let service = grid_service();
        let c = centroid_of(&service, 4, 4);
        let detections: Vec<Detection> = (0..5)
            .map(|i| detection_at(&format!("d{}", i), i, Some(c), "Tomato_Early_blight"))
            .collect();

        let (grid, stats) = service.build(&detections);
        let cell = grid.cell(4, 4).unwrap();

        assert_eq!(stats.infected_count, 1);
        assert_eq!(cell.detection_count, 5);
        assert_eq!(cell.severity, CellSeverity::High);
        assert_eq!(cell.dominant_label.as_deref(), Some("Tomato_Early_blight"));
        assert_eq!(stats.affected_cells[0].cell_id(), "4-4");
    }

    #[test]
    fn test_healthy_detections_count_but_do_not_infect() {
        let service = grid_service();
        let c = centroid_of(&service, 2, 5);
        let detections = vec![
            detection_at("h1", 1, Some(c), "Tomato_healthy"),
            detection_at("h2", 2, Some(c), "Tomato_healthy"),
        ];

        let (grid, stats) = service.build(&detections);
        let cell = grid.cell(2, 5).unwrap();

        assert_eq!(cell.detection_count, 2);
        assert!(!cell.infected);
        assert_eq!(cell.severity, CellSeverity::None);
        assert_eq!(stats.infected_count, 0);
        assert_eq!(stats.total_detections, 2);
    }

    #[test]
    fn test_missing_and_invalid_gps_are_quarantined() {
        let service = grid_service();
        let c = centroid_of(&service, 1, 1);
        let detections = vec![
            detection_at("ok", 1, Some(c), "Tomato_Early_blight"),
            detection_at("none", 2, None, "Tomato_Early_blight"),
            detection_at("bad", 3, Some(GpsCoordinates::new(95.0, 73.85)), "Tomato_Early_blight"),
        ];

        let (_, stats) = service.build(&detections);

        assert_eq!(stats.total_detections, 1);
        assert_eq!(stats.excluded_detections, 2);
        assert_eq!(stats.infected_count, 1);
    }

    #[test]
    fn test_dominant_label_breaks_ties_alphabetically() {
        let service = grid_service();
        let c = centroid_of(&service, 6, 2);
        let detections = vec![
            detection_at("a", 1, Some(c), "Tomato_Septoria_leaf_spot"),
            detection_at("b", 2, Some(c), "Tomato_Early_blight"),
        ];

        let (grid, _) = service.build(&detections);
        let cell = grid.cell(6, 2).unwrap();

        assert_eq!(cell.severity, CellSeverity::Medium);
        assert_eq!(cell.dominant_label.as_deref(), Some("Tomato_Early_blight"));
    }

    #[test]
    fn test_two_infected_cells_example() {
        let service = grid_service();
        let a = centroid_of(&service, 2, 3);
        let b = centroid_of(&service, 7, 8);
        let detections = vec![
            detection_at("d1", 1, Some(a), "Tomato_Early_blight"),
            detection_at("d2", 2, Some(a), "Tomato_Late_blight"),
            detection_at("d3", 3, Some(b), "Tomato_Bacterial_spot"),
        ];

        let (_, stats) = service.build(&detections);

        assert_eq!(stats.infected_count, 2);
        assert!((stats.infected_percentage - 2.0).abs() < 1e-9);
        assert!((stats.chemical_savings_percentage - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_recomputed_stats_match_build() {
        let service = grid_service();
        let c = centroid_of(&service, 0, 9);
        let (grid, stats) = service.build(&[detection_at("d", 1, Some(c), "spots")]);
        assert_eq!(compute_stats(&grid, 0), stats);
    }

    #[test]
    fn test_zero_resolution_is_raised_to_one_cell() {
        let service = ZoneGridService::new(Config::default().field.bounds(), 0);
        assert_eq!(service.resolution(), 1);

        let c = service.bounds().centroid();
        let (grid, stats) = service.build(&[detection_at("d", 1, Some(c), "blight")]);
        assert_eq!(stats.total_cells, 1);
        assert_eq!(stats.infected_count, 1);
        assert_eq!(grid.cell(0, 0).unwrap().detection_count, 1);
    }

    #[test]
    fn test_full_field_infection() {
        let service = grid_service();
        let grid = service.empty_grid();
        let detections: Vec<Detection> = grid
            .iter_cells()
            .enumerate()
            .map(|(i, cell)| detection_at(&format!("d{}", i), i as u64, Some(cell.centroid()), "blight"))
            .collect();

        let (_, stats) = service.build(&detections);
        assert!(stats.is_fully_infected());
        assert_eq!(stats.chemical_savings_percentage, 0.0);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn point_strategy() -> impl Strategy<Value = (f64, f64)> {
        // Field plus a margin on every side so clamping is exercised
        (18.5185f64..18.5223, 73.8558f64..73.8576)
    }

    proptest! {
        /// Every detection with a usable fix lands in exactly one cell
        #[test]
        fn test_grid_conservation(
            points in prop::collection::vec((point_strategy(), any::<bool>()), 0..60)
        ) {
            let detections: Vec<Detection> = points
                .iter()
                .enumerate()
                .map(|(i, ((lat, lng), sick))| {
                    let label = if *sick { "Tomato_Early_blight" } else { "Tomato_healthy" };
                    detection_at(&format!("d{}", i), i as u64, Some(GpsCoordinates::new(*lat, *lng)), label)
                })
                .collect();

            let (grid, stats) = grid_service().build(&detections);
            let binned: u32 = grid.iter_cells().map(|c| c.detection_count).sum();

            prop_assert_eq!(binned as usize, detections.len());
            prop_assert_eq!(stats.total_detections as usize, detections.len());
            prop_assert_eq!(stats.infected_count, stats.affected_cells.len());
            prop_assert!(stats.infected_count <= stats.total_cells);
        }

        /// Stats are a pure function of the detection set
        #[test]
        fn test_build_is_deterministic(
            points in prop::collection::vec(point_strategy(), 0..30)
        ) {
            let detections: Vec<Detection> = points
                .iter()
                .enumerate()
                .map(|(i, (lat, lng))| detection_at(&format!("d{}", i), i as u64, Some(GpsCoordinates::new(*lat, *lng)), "spots"))
                .collect();

            let service = grid_service();
            prop_assert_eq!(service.build(&detections), service.build(&detections));
        }
    }
}
