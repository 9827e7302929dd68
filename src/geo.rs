//! Great-circle bearing and distance between two fixes.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

/// Mean Earth radius in statute miles
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Sixteen-point compass, clockwise from north
const CARDINALS: [&str; 16] = [
    "North",
    "North-Northeast",
    "Northeast",
    "East-Northeast",
    "East",
    "East-Southeast",
    "Southeast",
    "South-Southeast",
    "South",
    "South-Southwest",
    "Southwest",
    "West-Southwest",
    "West",
    "West-Northwest",
    "Northwest",
    "North-Northwest",
];

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    fn validate(&self) -> Result<(), GeoError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(GeoError::InvalidLatitude(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(GeoError::InvalidLongitude(self.longitude));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoError {
    InvalidLatitude(f64),
    InvalidLongitude(f64),
}

impl Display for GeoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoError::InvalidLatitude(lat) => write!(f, "invalid latitude {}", lat),
            GeoError::InvalidLongitude(lon) => write!(f, "invalid longitude {}", lon),
        }
    }
}

impl std::error::Error for GeoError {}

/// Initial compass bearing from `from` toward `to`, in degrees within [0, 360).
///
/// Identical points have no defined heading; they yield 0.
pub fn bearing(from: GeoFix, to: GeoFix) -> Result<f64, GeoError> {
    from.validate()?;
    to.validate()?;
    if from == to {
        return Ok(0.0);
    }

    let lat1 = from.latitude * PI / 180.0;
    let lat2 = to.latitude * PI / 180.0;
    let dlon = (to.longitude - from.longitude) * PI / 180.0;

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let degrees = (y.atan2(x) * 180.0 / PI + 360.0) % 360.0;
    // Rounding can land exactly on 360 for tiny negative angles
    Ok(if degrees >= 360.0 { 0.0 } else { degrees })
}

/// Haversine great-circle distance in miles
pub fn distance_miles(from: GeoFix, to: GeoFix) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Name the compass point nearest `bearing`.
/// e.g., 0° -> "North", 22.5° -> "North-Northeast", 350° -> "North"
pub fn degrees_to_cardinal(bearing: f64) -> &'static str {
    let normalized = bearing.rem_euclid(360.0);
    let index = ((normalized / 22.5).round() as usize) % CARDINALS.len();
    CARDINALS[index]
}
