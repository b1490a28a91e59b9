use geo::Polygon;
use serde::{Deserialize, Serialize};

/// One beam footprint of a satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveragePolygon {
    pub satellite_id: String,
    pub service_area: String,
    pub center_id: u32,
    pub polygon: Polygon<f64>,
}

impl CoveragePolygon {
    pub fn new(
        satellite_id: impl Into<String>,
        service_area: impl Into<String>,
        center_id: u32,
        polygon: Polygon<f64>,
    ) -> Self {
        Self {
            satellite_id: satellite_id.into(),
            service_area: service_area.into(),
            center_id,
            polygon,
        }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }
}

/// Outline of a service area, the unit supply is projected onto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAreaPolygon {
    pub service_area_id: String,
    pub polygon: Polygon<f64>,
}

impl ServiceAreaPolygon {
    pub fn new(service_area_id: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self {
            service_area_id: service_area_id.into(),
            polygon,
        }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }
}
