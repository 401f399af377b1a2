//! AgriDrone decision pipeline
//!
//! Turns geotagged disease detections and environmental readings into a
//! zone grid, a spray route, an economic justification, fused diagnoses
//! and a prioritised alert stream.

pub mod config;
pub mod error;
pub mod external;
pub mod services;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};
