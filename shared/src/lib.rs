//! Shared types and models for the AgriDrone decision pipeline
//!
//! This crate holds the plain records exchanged between the pipeline
//! engine and whatever renders them (dashboard, map, PDF report).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
