//! Validation for geographic coordinates and sample values.

use crate::error::{CapmapError, Result};
use geo::Polygon;

/// Validates a latitude/longitude pair.
///
/// Latitude: [-90.0, 90.0], Longitude: [-180.0, 180.0]
///
/// # Examples
///
/// ```
/// use capmap::compute::validation::validate_coordinates;
///
/// assert!(validate_coordinates(40.7128, -74.0060).is_ok());
/// assert!(validate_coordinates(95.0, -74.0).is_err());
/// assert!(validate_coordinates(40.0, 200.0).is_err());
/// assert!(validate_coordinates(f64::NAN, 0.0).is_err());
/// ```
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() {
        return Err(CapmapError::InvalidCoordinate(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !lon.is_finite() {
        return Err(CapmapError::InvalidCoordinate(format!(
            "Longitude must be finite, got: {}",
            lon
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(CapmapError::InvalidCoordinate(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            lat
        )));
    }

    if !(-180.0..=180.0).contains(&lon) {
        return Err(CapmapError::InvalidCoordinate(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            lon
        )));
    }

    Ok(())
}

/// Resolves optional sample coordinates into a validated pair.
pub fn require_coordinates(lat: Option<f64>, lon: Option<f64>) -> Result<(f64, f64)> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            validate_coordinates(lat, lon)?;
            Ok((lat, lon))
        }
        (None, _) => Err(CapmapError::InvalidCoordinate(
            "Latitude is missing".to_string(),
        )),
        (_, None) => Err(CapmapError::InvalidCoordinate(
            "Longitude is missing".to_string(),
        )),
    }
}

/// Validates all polygon coordinates (exterior and interior rings).
///
/// GeoJSON stores `x` as longitude and `y` as latitude.
pub fn validate_polygon(polygon: &Polygon<f64>) -> Result<()> {
    for (idx, coord) in polygon.exterior().coords().enumerate() {
        validate_coordinates(coord.y, coord.x).map_err(|e| {
            CapmapError::InvalidCoordinate(format!("Exterior ring point at index {}: {}", idx, e))
        })?;
    }

    for (ring_idx, interior) in polygon.interiors().iter().enumerate() {
        for (idx, coord) in interior.coords().enumerate() {
            validate_coordinates(coord.y, coord.x).map_err(|e| {
                CapmapError::InvalidCoordinate(format!(
                    "Interior ring {} point at index {}: {}",
                    ring_idx, idx, e
                ))
            })?;
        }
    }

    Ok(())
}

/// Clamps a capacity value to be non-negative. Non-finite values become 0.
///
/// Returns the clamped value and whether it was changed.
pub fn non_negative_mbps(value: f64) -> (f64, bool) {
    if value.is_finite() && value >= 0.0 {
        (value, false)
    } else {
        (0.0, true)
    }
}
