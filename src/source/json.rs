//! Directory of JSON exports.
//!
//! Layout:
//!
//! ```text
//! demand.json                   every forecast
//! demand_{forecast}.json        optional, one forecast
//! supply.json
//! coverage.json                 beam footprints, GeoJSON `geom`
//! service_areas.json            area outlines, GeoJSON `geom`
//! allocation_{experiment}.json  optional, see `Experiment::resolve`
//! ```

use super::{DataSource, matches_epoch, matches_id};
use crate::allocation::{Experiment, allocate_experiment};
use crate::compute::geojson::polygon_from_geometry;
use crate::error::Result;
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};
use geojson::Geometry;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEMAND_FILE: &str = "demand.json";
pub const SUPPLY_FILE: &str = "supply.json";
pub const COVERAGE_FILE: &str = "coverage.json";
pub const SERVICE_AREAS_FILE: &str = "service_areas.json";

#[derive(Debug, Deserialize)]
struct CoverageRecord {
    satellite_id: String,
    service_area: String,
    center_id: u32,
    geom: Geometry,
}

#[derive(Debug, Deserialize)]
struct ServiceAreaRecord {
    service_area_id: String,
    geom: Geometry,
}

/// [`DataSource`] over a directory of JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn allocation_path(&self, experiment: &Experiment) -> PathBuf {
        self.dir.join(format!("allocation_{}.json", experiment.name))
    }

    fn read<T: DeserializeOwned>(&self, file_name: &str) -> Result<T> {
        let path = self.dir.join(file_name);
        let file = File::open(&path).inspect_err(|e| {
            log::debug!("Cannot open {}: {}", path.display(), e);
        })?;
        let records = serde_json::from_reader(BufReader::new(file))?;
        Ok(records)
    }
}

impl DataSource for JsonFileSource {
    fn demand_data(
        &self,
        forecast_id: Option<&str>,
        epoch: Option<u32>,
    ) -> Result<Vec<DemandSample>> {
        let per_forecast = forecast_id.map(|f| format!("demand_{}.json", f));
        let file_name = match &per_forecast {
            Some(name) if self.dir.join(name).is_file() => name.as_str(),
            _ => DEMAND_FILE,
        };

        let mut samples: Vec<DemandSample> = self.read(file_name)?;
        samples.retain(|s| {
            matches_id(&s.forecast_id, forecast_id) && matches_epoch(s.epoch, epoch)
        });
        Ok(samples)
    }

    fn allocation_data_for_experiment(
        &self,
        forecast_id: &str,
        projection_id: &str,
        epoch: Option<u32>,
    ) -> Result<Vec<AllocationSample>> {
        let experiment = Experiment::resolve(forecast_id, projection_id)?;
        let path = self.allocation_path(&experiment);

        let mut samples = if path.is_file() {
            let file_name = format!("allocation_{}.json", experiment.name);
            self.read::<Vec<AllocationSample>>(&file_name)?
        } else {
            log::info!(
                "{} not found; computing allocations for experiment {}",
                path.display(),
                experiment.name
            );
            let demand = self.demand_data(Some(forecast_id), None)?;
            let supply = self.supply_data(Some(projection_id))?;
            allocate_experiment(&demand, &supply, &experiment)
        };

        samples.retain(|s| matches_epoch(s.epoch, epoch));
        Ok(samples)
    }

    fn satellite_coverage(&self) -> Result<Vec<CoveragePolygon>> {
        let records: Vec<CoverageRecord> = self.read(COVERAGE_FILE)?;
        Ok(records
            .into_iter()
            .filter_map(|r| match polygon_from_geometry(&r.geom) {
                Ok(polygon) => Some(CoveragePolygon::new(
                    r.satellite_id,
                    r.service_area,
                    r.center_id,
                    polygon,
                )),
                Err(e) => {
                    log::warn!(
                        "Skipping beam {} of {}: {}",
                        r.center_id,
                        r.satellite_id,
                        e
                    );
                    None
                }
            })
            .collect())
    }

    fn service_areas(&self) -> Result<Vec<ServiceAreaPolygon>> {
        let records: Vec<ServiceAreaRecord> = self.read(SERVICE_AREAS_FILE)?;
        Ok(records
            .into_iter()
            .filter_map(|r| match polygon_from_geometry(&r.geom) {
                Ok(polygon) => Some(ServiceAreaPolygon::new(r.service_area_id, polygon)),
                Err(e) => {
                    log::warn!("Skipping service area {}: {}", r.service_area_id, e);
                    None
                }
            })
            .collect())
    }

    fn supply_data(&self, projection_id: Option<&str>) -> Result<Vec<SupplySample>> {
        let mut samples: Vec<SupplySample> = self.read(SUPPLY_FILE)?;
        samples.retain(|s| matches_id(&s.projection_id, projection_id));
        Ok(samples)
    }
}
