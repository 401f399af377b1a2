//! Recorded scenario replay
//!
//! A scenario is a JSON document of ticks exactly as the dashboard polled
//! them: cumulative detection lists, the sensor snapshot (or null) and any
//! operator actions taken after that refresh.

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::DetectionFeed;
use crate::error::{PipelineError, PipelineResult};
use crate::services::TickInput;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub ticks: Vec<TickInput>,
}

/// Feed that replays a recorded scenario tick by tick
#[derive(Debug, Clone)]
pub struct ScenarioFeed {
    ticks: VecDeque<TickInput>,
}

impl ScenarioFeed {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            ticks: scenario.ticks.into(),
        }
    }

    pub fn from_json(json: &str) -> PipelineResult<Self> {
        let scenario: Scenario = serde_json::from_str(json)
            .map_err(|e| PipelineError::Scenario(format!("malformed scenario: {}", e)))?;
        Ok(Self::new(scenario))
    }

    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Scenario(format!("cannot read {}: {}", path.display(), e))
        })?;

        let feed = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), ticks = feed.remaining(), "Scenario loaded");
        Ok(feed)
    }

    pub fn remaining(&self) -> usize {
        self.ticks.len()
    }
}

impl DetectionFeed for ScenarioFeed {
    fn next_tick(&mut self) -> Option<TickInput> {
        self.ticks.pop_front()
    }
}
