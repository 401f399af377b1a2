//! Validation utilities for pipeline inputs
//!
//! Bad individual records are quarantined by the pipeline, never raised;
//! these helpers tell it which records to quarantine.

use validator::Validate;

use crate::models::{Detection, SensorReading};
use crate::types::GpsCoordinates;

// ============================================================================
// Sensor Validations
// ============================================================================

/// Validate sensor ranges, returning every violation (sorted, one per field).
///
/// Range checks let NaN through, so non-finite values are rejected first.
pub fn validate_sensor_reading(reading: &SensorReading) -> Result<(), Vec<String>> {
    let mut messages: Vec<String> = [
        ("soil_moisture_percent", reading.soil_moisture_percent),
        ("soil_temperature_c", reading.soil_temperature_c),
        ("soil_ph", reading.soil_ph),
        ("air_temperature_c", reading.air_temperature_c),
        ("air_humidity_percent", reading.air_humidity_percent),
    ]
    .iter()
    .filter(|(_, value)| !value.is_finite())
    .map(|(field, _)| format!("{} must be a finite number", field))
    .collect();

    if let Err(errors) = reading.validate() {
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid ({})", field, err.code));
                messages.push(message);
            }
        }
    }

    if messages.is_empty() {
        return Ok(());
    }
    messages.sort();
    messages.dedup();

    Err(messages)
}

/// Soil pH band most crops tolerate
pub fn is_optimal_soil_ph(ph: f64) -> bool {
    (6.0..=7.5).contains(&ph)
}

// ============================================================================
// Detection Validations
// ============================================================================

/// Validate a vision confidence score
pub fn validate_confidence(confidence: f64) -> Result<(), &'static str> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err("Confidence must be between 0 and 1");
    }
    Ok(())
}

/// Validate GPS coordinates
pub fn validate_coordinates(gps: &GpsCoordinates) -> Result<(), &'static str> {
    if !gps.latitude.is_finite() || !(-90.0..=90.0).contains(&gps.latitude) {
        return Err("Latitude must be between -90 and 90");
    }
    if !gps.longitude.is_finite() || !(-180.0..=180.0).contains(&gps.longitude) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

/// Validate a detection can be placed on the field grid
pub fn validate_spatial_detection(detection: &Detection) -> Result<(), &'static str> {
    let gps = detection.gps.as_ref().ok_or("Detection has no GPS fix")?;
    validate_coordinates(gps)
}

/// Validate a detection can feed the fusion engine
pub fn validate_vision_detection(detection: &Detection) -> Result<(), &'static str> {
    let top = detection
        .top_classification()
        .ok_or("Detection has no classifications")?;
    if top.label.trim().is_empty() {
        return Err("Top classification has an empty label");
    }
    validate_confidence(top.confidence)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a percentage is within 0-100
pub fn validate_percentage(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}
