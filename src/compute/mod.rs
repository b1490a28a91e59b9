//! Input-side helpers shared by the pipeline stages.
//!
//! - Coordinate and value validation
//! - GeoJSON geometry conversion for coverage and service-area footprints

pub mod geojson;
pub mod validation;
