//! Upstream collaborators feeding the pipeline

pub mod scenario;

pub use scenario::ScenarioFeed;

use crate::services::TickInput;

/// Source of refresh ticks (detection polls plus sensor snapshots)
pub trait DetectionFeed {
    /// Next tick, or `None` once the feed is exhausted
    fn next_tick(&mut self) -> Option<TickInput>;
}
