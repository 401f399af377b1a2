//! Decision pipeline services
//!
//! One service per pipeline component plus the mission orchestrator that
//! wires them together.

pub mod alerts;
pub mod economics;
pub mod fusion;
pub mod mission;
pub mod spray_path;
pub mod zone_grid;

pub use alerts::AlertService;
pub use economics::EconomicImpactService;
pub use fusion::FusionService;
pub use mission::{MissionService, OperatorAction, TickInput};
pub use spray_path::SprayPathService;
pub use zone_grid::ZoneGridService;
