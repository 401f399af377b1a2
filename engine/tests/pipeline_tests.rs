//! End-to-end pipeline tests
//!
//! Covers:
//! - The two-cell reference mission from grid to alerts
//! - Mission session state (dedupe, GPS pins, start/end, reset)
//! - Operator actions carried through ticks
//! - Scenario replay input
//! - Zero-infection chain across every component

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use agridrone_engine::external::{DetectionFeed, ScenarioFeed};
use agridrone_engine::services::{MissionService, OperatorAction, TickInput, ZoneGridService};
use agridrone_engine::{Config, PipelineError};
use shared::{
    AlertType, Classification, Detection, DiagnosisKind, GpsCoordinates, MissionStatus,
    SensorReading,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 6, 0, 0).unwrap()
}

fn centroid(x: usize, y: usize) -> GpsCoordinates {
    ZoneGridService::from_config(&Config::default())
        .empty_grid()
        .cell(x, y)
        .unwrap()
        .centroid()
}

fn detection(id: &str, frame_id: u64, gps: Option<GpsCoordinates>, label: &str) -> Detection {
    Detection {
        id: id.to_string(),
        frame_id,
        timestamp: t0() + Duration::seconds(frame_id as i64),
        gps,
        classifications: vec![Classification::new(label, 0.85)],
    }
}

fn dry_hot_reading() -> SensorReading {
    SensorReading {
        timestamp: t0(),
        soil_moisture_percent: 15.0,
        soil_temperature_c: 27.0,
        soil_ph: 6.6,
        air_temperature_c: 32.0,
        air_humidity_percent: 50.0,
    }
}

fn reference_tick() -> TickInput {
    TickInput {
        at: None,
        detections: vec![
            detection("d1", 1, Some(centroid(2, 3)), "leaf_curl"),
            detection("d2", 2, Some(centroid(2, 3)), "leaf_curl"),
            detection("d3", 3, Some(centroid(7, 8)), "Tomato_Early_blight"),
        ],
        sensor: Some(dry_hot_reading()),
        operator: Vec::new(),
    }
}

fn mission() -> MissionService {
    MissionService::new(&Config::default(), t0()).unwrap()
}

// ============================================================================
// Reference mission
// ============================================================================

#[cfg(test)]
mod reference_tests {
    use super::*;

    #[test]
    fn test_two_cell_mission_snapshot() {
        let mut m = mission();
        let now = t0() + Duration::seconds(10);
        let snapshot = m.recompute(reference_tick(), now);

        // Grid
        assert_eq!(snapshot.grid_stats.infected_count, 2);
        assert!((snapshot.grid_stats.infected_percentage - 2.0).abs() < 1e-9);
        assert!((snapshot.grid_stats.chemical_savings_percentage - 98.0).abs() < 1e-9);

        // Path
        assert!(snapshot.spray_path.path_exists);
        assert_eq!(snapshot.spray_path.waypoints.len(), 2);
        assert_eq!(snapshot.spray_path.points().len(), 4);

        // Economics
        assert!(snapshot.economic_impact.has_infection);
        assert!(snapshot.economic_impact.net_benefit().unwrap() > Decimal::ZERO);

        // Fusion
        assert_eq!(snapshot.diagnoses.len(), 3);
        assert_eq!(snapshot.diagnoses[0].rule_id, "drought_stress");
        assert_eq!(snapshot.diagnoses[2].kind, DiagnosisKind::Uncertain);

        // Alerts
        let ids: Vec<&str> = snapshot.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["fusion_confirmed:drought_stress", "drought_stress:field"]);
        assert_eq!(snapshot.alerts[0].alert_type, AlertType::Critical);

        // Summary
        let s = &snapshot.summary;
        assert_eq!(s.mission_id, m.mission_id());
        assert_eq!(s.status, MissionStatus::Active);
        assert_eq!(s.frames_seen, 3);
        assert_eq!(s.total_detections, 3);
        assert_eq!(s.infected_zones, 2);
        assert_eq!(s.critical_alerts, 1);
        assert_eq!(s.warning_alerts, 1);
        assert_eq!(
            s.disease_types.iter().cloned().collect::<Vec<_>>(),
            vec!["Tomato_Early_blight".to_string(), "leaf_curl".to_string()]
        );
    }

    #[test]
    fn test_recompute_is_repeatable() {
        let mut m = mission();
        let now = t0() + Duration::seconds(10);
        let first = m.recompute(reference_tick(), now);
        let second = m.recompute(reference_tick(), now);

        assert_eq!(first.grid, second.grid);
        assert_eq!(first.spray_path, second.spray_path);
        assert_eq!(first.economic_impact, second.economic_impact);
        assert_eq!(first.diagnoses, second.diagnoses);
        assert_eq!(first.alerts, second.alerts);
    }

    #[test]
    fn test_snapshot_serialises() {
        let mut m = mission();
        let snapshot = m.recompute(reference_tick(), t0());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["grid_stats"]["infected_count"], 2);
        assert_eq!(json["alerts"][0]["type"], "CRITICAL");
        assert_eq!(json["summary"]["status"], "active");
    }
}

// ============================================================================
// Session state
// ============================================================================

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_cumulative_polls_are_deduplicated() {
        let mut m = mission();
        m.recompute(reference_tick(), t0());
        let snapshot = m.recompute(reference_tick(), t0() + Duration::seconds(2));

        assert_eq!(snapshot.summary.total_detections, 3);
        assert_eq!(snapshot.grid_stats.total_detections, 3);
    }

    #[test]
    fn test_gps_pin_keeps_frame_in_its_first_cell() {
        let mut m = mission();
        let tick = TickInput {
            detections: vec![
                detection("a", 5, Some(centroid(1, 1)), "blight"),
                detection("b", 5, Some(centroid(8, 8)), "blight"),
                detection("c", 5, None, "blight"),
            ],
            ..TickInput::default()
        };

        let snapshot = m.recompute(tick, t0());

        assert_eq!(snapshot.grid_stats.infected_count, 1);
        assert_eq!(snapshot.grid.cell(1, 1).unwrap().detection_count, 3);
        assert_eq!(snapshot.grid_stats.excluded_detections, 0);
    }

    #[test]
    fn test_detections_without_gps_are_excluded_not_fatal() {
        let mut m = mission();
        let tick = TickInput {
            detections: vec![
                detection("a", 1, None, "blight"),
                detection("b", 2, Some(centroid(0, 0)), "Tomato_healthy"),
            ],
            ..TickInput::default()
        };

        let snapshot = m.recompute(tick, t0());

        assert_eq!(snapshot.grid_stats.excluded_detections, 1);
        assert_eq!(snapshot.summary.excluded_detections, 1);
        assert_eq!(snapshot.grid_stats.infected_count, 0);
        // Still diagnosed by fusion
        assert_eq!(snapshot.diagnoses.len(), 2);
    }

    #[test]
    fn test_newer_sensor_reading_wins() {
        let mut m = mission();
        let newer = dry_hot_reading();
        let mut older = dry_hot_reading();
        older.timestamp = t0() - Duration::minutes(1);
        older.soil_moisture_percent = 50.0;

        m.ingest(Vec::new(), Some(newer.clone()));
        m.ingest(Vec::new(), Some(older));

        assert_eq!(m.latest_reading(), Some(&newer));
    }

    #[test]
    fn test_start_mission_resets_state() {
        let mut m = mission();
        m.recompute(reference_tick(), t0());
        let old_id = m.mission_id();

        let new_id = m.start_mission(t0() + Duration::hours(1));

        assert_ne!(old_id, new_id);
        assert!(m.detections().is_empty());
        assert!(m.latest_reading().is_none());
        assert!(m.alerts().active().is_empty());
    }

    #[test]
    fn test_completed_mission_ignores_input() {
        let mut m = mission();
        m.end_mission(t0()).unwrap();

        let snapshot = m.recompute(reference_tick(), t0());
        assert_eq!(snapshot.summary.status, MissionStatus::Completed);
        assert_eq!(snapshot.summary.ended_at, Some(t0()));
        assert_eq!(snapshot.summary.total_detections, 0);

        assert!(matches!(
            m.end_mission(t0()),
            Err(PipelineError::InvalidStateTransition(_))
        ));
    }

    #[test]
    fn test_invalid_config_refuses_to_start() {
        let mut config = Config::default();
        config.intervention.cost_per_hectare = Decimal::ZERO;

        match MissionService::new(&config, t0()) {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("mission started with invalid config"),
        }
    }
}

// ============================================================================
// Operator actions
// ============================================================================

#[cfg(test)]
mod operator_tests {
    use super::*;

    #[test]
    fn test_actions_apply_after_refresh_and_survive_next_tick() {
        let mut m = mission();
        let at = t0() + Duration::hours(6);

        let mut tick = reference_tick();
        tick.operator = vec![
            OperatorAction::Acknowledge("fusion_confirmed:drought_stress".to_string()),
            OperatorAction::Schedule {
                id: "fusion_confirmed:drought_stress".to_string(),
                at,
            },
        ];
        let snapshot = m.recompute(tick, t0());
        assert!(snapshot.alerts[0].acknowledged);
        assert_eq!(snapshot.alerts[0].scheduled_for, Some(at));

        let next = m.recompute(TickInput::default(), t0() + Duration::seconds(2));
        assert!(next.alerts[0].acknowledged);
        assert_eq!(next.alerts[0].scheduled_for, Some(at));
    }

    #[test]
    fn test_rejected_action_does_not_break_tick() {
        let mut m = mission();
        let mut tick = reference_tick();
        tick.operator = vec![OperatorAction::Schedule {
            id: "drought_stress:field".to_string(),
            at: t0() + Duration::hours(1),
        }];

        let snapshot = m.recompute(tick, t0());
        assert_eq!(snapshot.alerts.len(), 2);
        assert!(snapshot.alerts.iter().all(|a| a.scheduled_for.is_none()));
    }
}

// ============================================================================
// Scenario replay
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "ticks": [
            {
                "at": "2026-06-01T06:00:00Z",
                "detections": [
                    {
                        "id": "d1",
                        "frame_id": 1,
                        "timestamp": "2026-06-01T05:59:58Z",
                        "gps": { "latitude": 18.5204, "longitude": 73.8567 },
                        "classifications": [{ "label": "leaf_curl", "confidence": 0.9 }]
                    }
                ],
                "sensor": null
            },
            {
                "operator": [
                    { "acknowledge": "disease_detected:field" },
                    { "schedule": { "id": "disease_detected:field", "at": "2026-06-01T09:00:00Z" } }
                ]
            }
        ]
    }"#;

    #[test]
    fn test_feed_yields_ticks_in_order() {
        let mut feed = ScenarioFeed::from_json(SCENARIO).unwrap();
        assert_eq!(feed.remaining(), 2);

        let first = feed.next_tick().unwrap();
        assert_eq!(first.at, Some(t0()));
        assert_eq!(first.detections.len(), 1);
        assert!(first.sensor.is_none());

        let second = feed.next_tick().unwrap();
        assert!(second.detections.is_empty());
        assert_eq!(
            second.operator[0],
            OperatorAction::Acknowledge("disease_detected:field".to_string())
        );
        assert!(matches!(second.operator[1], OperatorAction::Schedule { .. }));

        assert!(feed.next_tick().is_none());
    }

    #[test]
    fn test_replay_through_mission() {
        let mut feed = ScenarioFeed::from_json(SCENARIO).unwrap();
        let mut m = mission();

        let mut last = None;
        let mut now = t0();
        while let Some(tick) = feed.next_tick() {
            now = tick.at.unwrap_or(now + Duration::seconds(2));
            last = Some(m.recompute(tick, now));
        }

        let snapshot = last.unwrap();
        let detected = snapshot
            .alerts
            .iter()
            .find(|a| a.id == "disease_detected:field")
            .unwrap();
        assert!(detected.acknowledged);
        // INFO alerts cannot be scheduled
        assert!(detected.scheduled_for.is_none());
        assert!(snapshot.alerts.iter().any(|a| a.id == "sensor_missing:sensor"));
    }

    #[test]
    fn test_malformed_scenario() {
        assert!(matches!(
            ScenarioFeed::from_json("{ \"ticks\": 3 }"),
            Err(PipelineError::Scenario(_))
        ));
        assert!(matches!(
            ScenarioFeed::from_path("does/not/exist.json"),
            Err(PipelineError::Scenario(_))
        ));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        /// No infected cell ⇒ no path ⇒ no economic impact
        #[test]
        fn test_zero_infection_chain(
            cells in prop::collection::vec((0usize..10, 0usize..10), 0..25)
        ) {
            let detections: Vec<Detection> = cells
                .iter()
                .enumerate()
                .map(|(i, (x, y))| detection(&format!("h{}", i), i as u64, Some(centroid(*x, *y)), "Tomato_healthy"))
                .collect();
            let tick = TickInput { detections, ..TickInput::default() };

            let snapshot = mission().recompute(tick, t0());

            prop_assert_eq!(snapshot.grid_stats.infected_count, 0);
            prop_assert!(!snapshot.spray_path.path_exists);
            prop_assert!(!snapshot.economic_impact.has_infection);
            prop_assert!(snapshot.alerts.iter().all(|a| a.alert_type != AlertType::Critical));
        }
    }
}
