//! Common types used across the pipeline

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Metres per degree of latitude (flat approximation, fine at field scale)
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle (haversine) distance in metres
    pub fn distance_to(&self, other: &GpsCoordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }
}

/// Axis-aligned lat/lng rectangle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl GeoBounds {
    /// Rectangle of `length_m` (north-south) by `width_m` (east-west) centred on `center`
    pub fn around(center: GpsCoordinates, length_m: f64, width_m: f64) -> Self {
        let half_lat = (length_m / 2.0) / METERS_PER_DEGREE_LAT;
        let half_lng =
            (width_m / 2.0) / (METERS_PER_DEGREE_LAT * center.latitude.to_radians().cos());

        Self {
            lat_min: center.latitude - half_lat,
            lat_max: center.latitude + half_lat,
            lng_min: center.longitude - half_lng,
            lng_max: center.longitude + half_lng,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.lat_max - self.lat_min
    }

    pub fn lng_span(&self) -> f64 {
        self.lng_max - self.lng_min
    }

    pub fn contains(&self, point: &GpsCoordinates) -> bool {
        (self.lat_min..=self.lat_max).contains(&point.latitude)
            && (self.lng_min..=self.lng_max).contains(&point.longitude)
    }

    pub fn centroid(&self) -> GpsCoordinates {
        GpsCoordinates::new(
            (self.lat_min + self.lat_max) / 2.0,
            (self.lng_min + self.lng_max) / 2.0,
        )
    }

    /// South-west corner
    pub fn south_west(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.lat_min, self.lng_min)
    }

    /// North-east corner
    pub fn north_east(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.lat_max, self.lng_max)
    }
}
