//! Data access for the map pipeline.
//!
//! [`DataSource`] is the narrow interface the session fetches through. Two
//! implementations ship with the crate: [`JsonFileSource`] reads a directory
//! of JSON exports, [`MemorySource`] serves preloaded records.

use crate::error::Result;
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};

pub mod json;
pub mod memory;

pub use json::JsonFileSource;
pub use memory::MemorySource;

/// Read-only access to demand, supply, coverage and allocation records.
///
/// Optional selectors narrow the result; `None` returns every record.
pub trait DataSource: Send + Sync {
    /// Demand samples, optionally for one forecast and one epoch.
    fn demand_data(&self, forecast_id: Option<&str>, epoch: Option<u32>)
    -> Result<Vec<DemandSample>>;

    /// Allocation samples of the experiment pairing `forecast_id` with
    /// `projection_id`, optionally for one epoch.
    fn allocation_data_for_experiment(
        &self,
        forecast_id: &str,
        projection_id: &str,
        epoch: Option<u32>,
    ) -> Result<Vec<AllocationSample>>;

    /// Beam footprints of every satellite.
    fn satellite_coverage(&self) -> Result<Vec<CoveragePolygon>>;

    /// Service area outlines.
    fn service_areas(&self) -> Result<Vec<ServiceAreaPolygon>>;

    /// Supply projections, optionally for one projection.
    fn supply_data(&self, projection_id: Option<&str>) -> Result<Vec<SupplySample>>;
}

pub(crate) fn matches_epoch(epoch: u32, selector: Option<u32>) -> bool {
    selector.is_none_or(|e| e == epoch)
}

pub(crate) fn matches_id(id: &str, selector: Option<&str>) -> bool {
    selector.is_none_or(|s| s == id)
}
