//! Hexagonal grid indexing backed by H3.
//!
//! Every function here is a pure function of its arguments: the same
//! coordinate and resolution always produce the same cell, in any process.

use crate::compute::validation::validate_coordinates;
use crate::error::{CapmapError, Result};
use geo::{Coord, LineString, Polygon};
use h3o::{LatLng, Resolution};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Identifier of one hexagonal grid cell.
pub type CellId = h3o::CellIndex;

/// Grid resolution. Higher values produce smaller, more numerous cells.
///
/// The index accepts the full H3 range 0..=15; the map only offers
/// [`GridResolution::SUPPORTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GridResolution(u8);

impl GridResolution {
    /// Resolutions selectable in the map controls.
    pub const SUPPORTED: RangeInclusive<u8> = 2..=7;

    pub const MAX: u8 = 15;

    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX {
            return Err(CapmapError::InvalidResolution(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_supported(self) -> bool {
        Self::SUPPORTED.contains(&self.0)
    }

    fn to_h3(self) -> Resolution {
        // Range is checked on construction.
        Resolution::try_from(self.0).unwrap_or(Resolution::Fifteen)
    }
}

impl Default for GridResolution {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u8> for GridResolution {
    type Error = CapmapError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GridResolution> for u8 {
    fn from(resolution: GridResolution) -> Self {
        resolution.0
    }
}

impl fmt::Display for GridResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the cell containing `(lat, lon)` at `resolution`.
///
/// # Examples
///
/// ```rust
/// use capmap::grid::{cell_id, GridResolution};
///
/// let res = GridResolution::new(4)?;
/// let a = cell_id(10.0, 10.0, res)?;
/// let b = cell_id(10.0001, 10.0001, res)?;
/// assert_eq!(a, b);
/// # Ok::<(), capmap::CapmapError>(())
/// ```
pub fn cell_id(lat: f64, lon: f64, resolution: GridResolution) -> Result<CellId> {
    validate_coordinates(lat, lon)?;
    let latlng = LatLng::new(lat, lon)
        .map_err(|e| CapmapError::InvalidCoordinate(format!("({}, {}): {}", lat, lon, e)))?;
    Ok(latlng.to_cell(resolution.to_h3()))
}

/// Returns the `(lat, lon)` center of a cell.
pub fn cell_center(cell: CellId) -> (f64, f64) {
    let center = LatLng::from(cell);
    (center.lat(), center.lng())
}

/// Returns the hexagon (or pentagon) footprint of a cell as a closed polygon
/// in `(x: lon, y: lat)` order.
pub fn cell_boundary(cell: CellId) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = cell
        .boundary()
        .iter()
        .map(|vertex| Coord {
            x: vertex.lng(),
            y: vertex.lat(),
        })
        .collect();
    // geo closes the ring.
    Polygon::new(LineString::from(coords), Vec::new())
}

/// Resolution a cell id was produced at.
pub fn cell_resolution(cell: CellId) -> GridResolution {
    GridResolution(u8::from(cell.resolution()))
}
