use serde::{Deserialize, Serialize};

/// Forecast demand of one entity at one epoch.
///
/// One record exists per (entity, epoch). Coordinates are optional on the wire;
/// a sample without both is not placeable on the grid.
///
/// # Examples
///
/// ```
/// use capmap_types::sample::DemandSample;
///
/// let sample = DemandSample::new("e1", 10.0, 10.0, "EUROPE", 50.0, 0, "base_forecast");
/// assert_eq!(sample.demand_mbps, 50.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSample {
    pub entity_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub service_area: String,
    pub demand_mbps: f64,
    pub epoch: u32,
    pub forecast_id: String,
    /// ISO-8601 wall-clock time of the epoch, when the producer recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl DemandSample {
    pub fn new(
        entity_id: impl Into<String>,
        lat: f64,
        lon: f64,
        service_area: impl Into<String>,
        demand_mbps: f64,
        epoch: u32,
        forecast_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            lat: Some(lat),
            lon: Some(lon),
            service_area: service_area.into(),
            demand_mbps,
            epoch,
            forecast_id: forecast_id.into(),
            timestamp: None,
        }
    }

    /// `(lat, lon)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// Capacity granted to one demand entity at one epoch.
///
/// Allocation records are demand records extended with the granted capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSample {
    pub entity_id: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub service_area: String,
    pub demand_mbps: f64,
    pub allocated_mbps: f64,
    pub epoch: u32,
    /// Supplying satellite, when the area is served by a single one.
    #[serde(default)]
    pub satellite_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<String>,
}

impl AllocationSample {
    pub fn new(
        entity_id: impl Into<String>,
        lat: f64,
        lon: f64,
        service_area: impl Into<String>,
        demand_mbps: f64,
        allocated_mbps: f64,
        epoch: u32,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            lat: Some(lat),
            lon: Some(lon),
            service_area: service_area.into(),
            demand_mbps,
            allocated_mbps,
            epoch,
            satellite_id: None,
            forecast_id: None,
            satisfaction_pct: None,
            experiment: None,
        }
    }

    pub fn with_satellite(mut self, satellite_id: impl Into<String>) -> Self {
        self.satellite_id = Some(satellite_id.into());
        self
    }

    /// `(lat, lon)` when both are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// Capacity a satellite projects onto a service area under one projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySample {
    pub projection_id: String,
    pub satellite_id: String,
    pub service_area: String,
    pub supply_mbps: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_end: Option<String>,
}

impl SupplySample {
    pub fn new(
        projection_id: impl Into<String>,
        satellite_id: impl Into<String>,
        service_area: impl Into<String>,
        supply_mbps: f64,
    ) -> Self {
        Self {
            projection_id: projection_id.into(),
            satellite_id: satellite_id.into(),
            service_area: service_area.into(),
            supply_mbps,
            projection_start: None,
            projection_end: None,
        }
    }
}
