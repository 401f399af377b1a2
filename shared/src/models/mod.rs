//! Domain models for the agronomic decision pipeline

mod alert;
mod detection;
mod economics;
mod fusion;
mod grid;
mod mission;
mod sensor;
mod spray;

pub use alert::*;
pub use detection::*;
pub use economics::*;
pub use fusion::*;
pub use grid::*;
pub use mission::*;
pub use sensor::*;
pub use spray::*;
