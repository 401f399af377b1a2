//! AgriDrone scenario replay
//!
//! Replays a recorded mission through the decision pipeline on a fixed
//! tick interval, the way the dashboard drives it live, and prints the
//! final snapshot as JSON.

use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agridrone_engine::external::{DetectionFeed, ScenarioFeed};
use agridrone_engine::services::MissionService;
use agridrone_engine::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agridrone_engine=debug,agridrone_replay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    config.validate()?;

    tracing::info!("Starting AgriDrone scenario replay");
    tracing::info!("Environment: {}", config.environment);

    let scenario_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.replay.scenario_path.clone());
    let mut feed = ScenarioFeed::from_path(&scenario_path)?;

    let mut mission = MissionService::new(&config, Utc::now())?;

    let period = Duration::from_millis(config.replay.tick_interval_ms.max(1));
    let mut interval = tokio::time::interval(period);

    let mut snapshot = None;
    let mut tick_count = 0usize;
    while let Some(tick) = feed.next_tick() {
        interval.tick().await;

        let now = tick.at.unwrap_or_else(Utc::now);
        let result = mission.recompute(tick, now);
        tick_count += 1;

        tracing::info!(
            tick = tick_count,
            infected = result.grid_stats.infected_count,
            alerts = result.alerts.len(),
            "Tick processed"
        );
        snapshot = Some(result);
    }

    let ended_at = Utc::now();
    mission.end_mission(ended_at)?;

    match snapshot {
        Some(mut snapshot) => {
            snapshot.summary.status = mission.status();
            snapshot.summary.ended_at = Some(ended_at);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        None => tracing::warn!("Scenario contained no ticks"),
    }

    Ok(())
}
