//! Configuration management for the AgriDrone decision pipeline
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code (`Config::default()`)
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with AGRIDRONE__ prefix
//!
//! Configuration is static for a mission; the pipeline never mutates it.

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::validation::validate_percentage;
use shared::{GeoBounds, GpsCoordinates};
use validator::Validate;

use crate::error::{PipelineError, PipelineResult};

/// Main pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Field geometry
    pub field: FieldConfig,

    /// Zone grid resolution
    pub grid: GridConfig,

    /// Crop economics
    pub crop: CropConfig,

    /// Disease loss model
    pub disease: DiseaseConfig,

    /// Spray cost model
    pub intervention: InterventionConfig,

    /// Chemical usage
    pub environmental: EnvironmentalConfig,

    /// Spray drone performance
    pub drone: DroneConfig,

    /// Vision + sensor fusion
    pub fusion: FusionConfig,

    /// Alert thresholds and debouncing
    pub alerts: AlertConfig,

    /// Scenario replay binary
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct FieldConfig {
    #[validate(range(min = -90.0, max = 90.0, message = "center latitude out of range"))]
    pub center_latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "center longitude out of range"))]
    pub center_longitude: f64,

    /// North-south extent in metres
    pub length_m: f64,

    /// East-west extent in metres
    pub width_m: f64,

    pub total_area_hectares: Decimal,

    /// Defaults to total area / resolution²
    pub cell_area_hectares: Option<Decimal>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GridConfig {
    /// Cells per side (N for an N×N grid)
    pub resolution: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CropConfig {
    pub name: String,

    /// Kilograms per hectare with zero infection
    pub yield_per_hectare: Decimal,

    pub price_per_kg: Decimal,

    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiseaseConfig {
    /// Yield lost on infected area when left untreated (percent)
    pub loss_percentage_untreated: Decimal,

    /// Yield still lost on infected area after treatment (percent)
    pub loss_percentage_treated: Decimal,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InterventionConfig {
    pub cost_per_hectare: Decimal,

    pub fixed_cost_per_mission: Decimal,

    pub applications_per_season: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EnvironmentalConfig {
    /// Litres of chemical sprayed per hectare
    pub chemical_per_hectare: Decimal,
}

/// Where the spray route finishes
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PathEndPoint {
    /// North-east field corner
    OppositeCorner,
    /// Back to the south-west launch corner
    ReturnToStart,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct DroneConfig {
    pub cruise_speed_mps: f64,

    #[validate(range(min = 0.0, message = "dwell time cannot be negative"))]
    pub dwell_seconds_per_waypoint: f64,

    pub end_point: PathEndPoint,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct FusionConfig {
    /// Readings older than this are flagged stale
    #[validate(range(min = 1, message = "sensor max age must be at least one second"))]
    pub sensor_max_age_seconds: i64,

    /// Multiplier applied to vision confidence without sensor context
    #[validate(range(min = 0.0, max = 1.0, message = "vision-only factor must be within 0-1"))]
    pub vision_only_factor: f64,

    /// Most recent detections diagnosed per tick
    #[validate(range(min = 1, message = "fusion window must hold at least one detection"))]
    pub window_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct AlertConfig {
    #[validate(range(min = 0.0, max = 100.0, message = "critical threshold must be a percentage"))]
    pub critical_infection_percentage: f64,

    #[validate(range(min = 0.0, max = 100.0, message = "warning threshold must be a percentage"))]
    pub warning_infection_percentage: f64,

    pub dry_soil_moisture_percentage: f64,

    pub waterlogged_soil_moisture_percentage: f64,

    pub fungal_humidity_percentage: f64,

    pub fungal_min_temperature_c: f64,

    pub fungal_max_temperature_c: f64,

    pub heat_stress_temperature_c: f64,

    /// Minimum fusion confidence before a diagnosis escalates on its own
    #[validate(range(min = 0.0, max = 1.0, message = "fusion confidence threshold must be within 0-1"))]
    pub fusion_confidence_threshold: f64,

    /// Cool-down during which a re-fired alert reuses the earlier instance
    #[validate(range(min = 0, message = "debounce window cannot be negative"))]
    pub debounce_window_seconds: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReplayConfig {
    /// Recorded scenario JSON
    pub scenario_path: String,

    /// Delay between replayed ticks; 0 replays as fast as possible
    pub tick_interval_ms: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("AGRIDRONE_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let defaults = Config {
            environment: environment.clone(),
            ..Config::default()
        };

        let config = config::Config::builder()
            // Start with default values
            .add_source(config::Config::try_from(&defaults)?)
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (AGRIDRONE__ prefix)
            .add_source(
                Environment::with_prefix("AGRIDRONE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject configurations that would produce nonsensical figures.
    ///
    /// Called once at startup; the pipeline refuses to run on failure.
    pub fn validate(&self) -> PipelineResult<()> {
        check_sections(&self.field)?;
        check_sections(&self.drone)?;
        check_sections(&self.fusion)?;
        check_sections(&self.alerts)?;

        if self.field.length_m <= 0.0 || self.field.width_m <= 0.0 {
            return Err(invalid("field", "field length and width must be positive"));
        }
        if self.field.total_area_hectares <= Decimal::ZERO {
            return Err(invalid("field.total_area_hectares", "field area must be positive"));
        }
        if self.grid.resolution == 0 {
            return Err(invalid("grid.resolution", "grid needs at least one cell"));
        }
        if let Some(cell_area) = self.field.cell_area_hectares {
            if cell_area <= Decimal::ZERO {
                return Err(invalid("field.cell_area_hectares", "cell area must be positive"));
            }
            if cell_area * self.total_cells_decimal() > self.field.total_area_hectares {
                return Err(invalid(
                    "field.cell_area_hectares",
                    "cells cover more than the field area",
                ));
            }
        }

        if self.crop.yield_per_hectare <= Decimal::ZERO {
            return Err(invalid("crop.yield_per_hectare", "yield must be positive"));
        }
        if self.crop.price_per_kg <= Decimal::ZERO {
            return Err(invalid("crop.price_per_kg", "price must be positive"));
        }

        let hundred = Decimal::ONE_HUNDRED;
        let untreated = self.disease.loss_percentage_untreated;
        let treated = self.disease.loss_percentage_treated;
        if untreated < Decimal::ZERO || untreated > hundred {
            return Err(invalid("disease.loss_percentage_untreated", "must be within 0-100"));
        }
        if treated < Decimal::ZERO || treated > hundred {
            return Err(invalid("disease.loss_percentage_treated", "must be within 0-100"));
        }
        if treated > untreated {
            return Err(invalid(
                "disease.loss_percentage_treated",
                "treated loss cannot exceed untreated loss",
            ));
        }

        if self.intervention.cost_per_hectare <= Decimal::ZERO {
            return Err(invalid("intervention.cost_per_hectare", "cost must be positive"));
        }
        if self.intervention.fixed_cost_per_mission < Decimal::ZERO {
            return Err(invalid(
                "intervention.fixed_cost_per_mission",
                "fixed cost cannot be negative",
            ));
        }
        if self.intervention.applications_per_season == 0 {
            return Err(invalid(
                "intervention.applications_per_season",
                "at least one application per season",
            ));
        }
        if self.environmental.chemical_per_hectare < Decimal::ZERO {
            return Err(invalid(
                "environmental.chemical_per_hectare",
                "chemical volume cannot be negative",
            ));
        }

        if !(self.drone.cruise_speed_mps > 0.0) {
            return Err(invalid("drone.cruise_speed_mps", "cruise speed must be positive"));
        }

        for (field, value) in [
            ("alerts.dry_soil_moisture_percentage", self.alerts.dry_soil_moisture_percentage),
            (
                "alerts.waterlogged_soil_moisture_percentage",
                self.alerts.waterlogged_soil_moisture_percentage,
            ),
            ("alerts.fungal_humidity_percentage", self.alerts.fungal_humidity_percentage),
        ] {
            validate_percentage(value).map_err(|message| invalid(field, message))?;
        }
        if self.alerts.warning_infection_percentage > self.alerts.critical_infection_percentage {
            return Err(invalid(
                "alerts.warning_infection_percentage",
                "warning threshold cannot exceed critical threshold",
            ));
        }

        Ok(())
    }

    /// Explicit cell area, or the field area split evenly across the grid
    pub fn cell_area_hectares(&self) -> Decimal {
        self.field
            .cell_area_hectares
            .unwrap_or_else(|| self.field.total_area_hectares / self.total_cells_decimal())
    }

    fn total_cells_decimal(&self) -> Decimal {
        Decimal::from(self.grid.resolution as u64 * self.grid.resolution as u64)
    }
}

impl FieldConfig {
    pub fn center(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.center_latitude, self.center_longitude)
    }

    /// Field bounding box, derived once from centre and extents
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::around(self.center(), self.length_m, self.width_m)
    }
}

fn invalid(field: &str, message: &str) -> PipelineError {
    PipelineError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// First (alphabetical) range violation of a section, if any
fn check_sections<T: Validate>(section: &T) -> PipelineResult<()> {
    let errors = match section.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let mut violations: Vec<(String, String)> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for err in field_errors.iter() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            violations.push((field.to_string(), message));
        }
    }
    violations.sort();

    match violations.into_iter().next() {
        Some((field, message)) => Err(PipelineError::InvalidConfig { field, message }),
        None => Ok(()),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            field: FieldConfig::default(),
            grid: GridConfig::default(),
            crop: CropConfig::default(),
            disease: DiseaseConfig::default(),
            intervention: InterventionConfig::default(),
            environmental: EnvironmentalConfig::default(),
            drone: DroneConfig::default(),
            fusion: FusionConfig::default(),
            alerts: AlertConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            center_latitude: 18.5204,
            center_longitude: 73.8567,
            length_m: 200.0,
            width_m: 100.0,
            total_area_hectares: Decimal::new(2, 0),
            cell_area_hectares: None,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { resolution: 10 }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            name: "tomato".to_string(),
            yield_per_hectare: Decimal::new(40_000, 0),
            price_per_kg: Decimal::new(25, 0),
            currency: "INR".to_string(),
        }
    }
}

impl Default for DiseaseConfig {
    fn default() -> Self {
        Self {
            loss_percentage_untreated: Decimal::new(45, 0),
            loss_percentage_treated: Decimal::new(5, 0),
        }
    }
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            cost_per_hectare: Decimal::new(3_000, 0),
            fixed_cost_per_mission: Decimal::new(500, 0),
            applications_per_season: 3,
        }
    }
}

impl Default for EnvironmentalConfig {
    fn default() -> Self {
        Self {
            chemical_per_hectare: Decimal::new(200, 0),
        }
    }
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            cruise_speed_mps: 5.0,
            dwell_seconds_per_waypoint: 3.0,
            end_point: PathEndPoint::OppositeCorner,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            sensor_max_age_seconds: 300,
            vision_only_factor: 0.8,
            window_size: 10,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            critical_infection_percentage: 30.0,
            warning_infection_percentage: 10.0,
            dry_soil_moisture_percentage: 20.0,
            waterlogged_soil_moisture_percentage: 80.0,
            fungal_humidity_percentage: 85.0,
            fungal_min_temperature_c: 20.0,
            fungal_max_temperature_c: 30.0,
            heat_stress_temperature_c: 35.0,
            fusion_confidence_threshold: 0.85,
            debounce_window_seconds: 45,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            scenario_path: "scenarios/demo.json".to_string(),
            tick_interval_ms: 2_000,
        }
    }
}
