//! GeoJSON conversion for footprint polygons.

use crate::compute::validation::validate_polygon;
use crate::error::{CapmapError, Result};
use geo::{Coord, LineString, Polygon};
use geojson::{Geometry, Value};

fn ring_from_positions(ring: &[Vec<f64>]) -> Result<LineString<f64>> {
    let coords = ring
        .iter()
        .map(|position| {
            if position.len() < 2 {
                return Err(CapmapError::InvalidInput(
                    "Coordinate must have at least 2 values".to_string(),
                ));
            }
            Ok(Coord {
                x: position[0],
                y: position[1],
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::from(coords))
}

/// Converts a GeoJSON geometry into a Polygon.
///
/// A `MultiPolygon` with exactly one member is accepted as that polygon.
pub fn polygon_from_geometry(geometry: &Geometry) -> Result<Polygon<f64>> {
    let rings = match &geometry.value {
        Value::Polygon(rings) => rings,
        Value::MultiPolygon(polygons) if polygons.len() == 1 => &polygons[0],
        _ => {
            return Err(CapmapError::InvalidInput(
                "GeoJSON geometry is not a Polygon".to_string(),
            ));
        }
    };

    let Some((exterior, interiors)) = rings.split_first() else {
        return Err(CapmapError::InvalidInput(
            "Polygon must have at least one ring".to_string(),
        ));
    };

    let exterior = ring_from_positions(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| ring_from_positions(ring))
        .collect::<Result<Vec<_>>>()?;

    let polygon = Polygon::new(exterior, interiors);
    validate_polygon(&polygon)?;
    Ok(polygon)
}
