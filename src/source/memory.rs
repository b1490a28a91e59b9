use super::{DataSource, matches_epoch, matches_id};
use crate::allocation::{Experiment, allocate_experiment};
use crate::error::Result;
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};

/// In-memory data source.
///
/// Allocation samples are matched to experiments by their `experiment`
/// label. Experiments with no stored samples are computed from demand and
/// supply on request.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    demand: Vec<DemandSample>,
    supply: Vec<SupplySample>,
    coverage: Vec<CoveragePolygon>,
    service_areas: Vec<ServiceAreaPolygon>,
    allocations: Vec<AllocationSample>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_demand(mut self, demand: Vec<DemandSample>) -> Self {
        self.demand = demand;
        self
    }

    pub fn with_supply(mut self, supply: Vec<SupplySample>) -> Self {
        self.supply = supply;
        self
    }

    pub fn with_coverage(mut self, coverage: Vec<CoveragePolygon>) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn with_service_areas(mut self, service_areas: Vec<ServiceAreaPolygon>) -> Self {
        self.service_areas = service_areas;
        self
    }

    pub fn with_allocations(mut self, allocations: Vec<AllocationSample>) -> Self {
        self.allocations = allocations;
        self
    }
}

impl DataSource for MemorySource {
    fn demand_data(
        &self,
        forecast_id: Option<&str>,
        epoch: Option<u32>,
    ) -> Result<Vec<DemandSample>> {
        Ok(self
            .demand
            .iter()
            .filter(|s| matches_id(&s.forecast_id, forecast_id) && matches_epoch(s.epoch, epoch))
            .cloned()
            .collect())
    }

    fn allocation_data_for_experiment(
        &self,
        forecast_id: &str,
        projection_id: &str,
        epoch: Option<u32>,
    ) -> Result<Vec<AllocationSample>> {
        let experiment = Experiment::resolve(forecast_id, projection_id)?;

        let stored: Vec<AllocationSample> = self
            .allocations
            .iter()
            .filter(|s| s.experiment.as_deref() == Some(experiment.name.as_str()))
            .filter(|s| matches_epoch(s.epoch, epoch))
            .cloned()
            .collect();
        if !stored.is_empty() {
            return Ok(stored);
        }

        let mut computed = allocate_experiment(&self.demand, &self.supply, &experiment);
        computed.retain(|s| matches_epoch(s.epoch, epoch));
        Ok(computed)
    }

    fn satellite_coverage(&self) -> Result<Vec<CoveragePolygon>> {
        Ok(self.coverage.clone())
    }

    fn service_areas(&self) -> Result<Vec<ServiceAreaPolygon>> {
        Ok(self.service_areas.clone())
    }

    fn supply_data(&self, projection_id: Option<&str>) -> Result<Vec<SupplySample>> {
        Ok(self
            .supply
            .iter()
            .filter(|s| matches_id(&s.projection_id, projection_id))
            .cloned()
            .collect())
    }
}
