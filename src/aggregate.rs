//! Grouping of point samples into hexagonal cells.
//!
//! Aggregation is two strictly ordered passes:
//!
//! 1. [`accumulate`] folds every sample into its cell, summing demand and
//!    allocation and counting samples.
//! 2. [`compute_optimality`] consumes the finished accumulation and derives
//!    each cell's optimality ratio.
//!
//! The second pass takes [`AccumulatedCells`] by value, so it cannot be
//! interleaved with accumulation. [`aggregate`] runs both.
//!
//! ```rust
//! use capmap::aggregate::aggregate;
//! use capmap::grid::GridResolution;
//! use capmap_types::sample::DemandSample;
//!
//! let samples = vec![
//!     DemandSample::new("a", 10.0, 10.0, "EUROPE", 50.0, 0, "base_forecast"),
//!     DemandSample::new("b", 10.0001, 10.0001, "EUROPE", 30.0, 0, "base_forecast"),
//! ];
//! let result = aggregate(&samples, GridResolution::new(4)?);
//! assert_eq!(result.cells.len(), 1);
//! let cell = result.cells.values().next().unwrap();
//! assert_eq!(cell.sum_demand(), 80.0);
//! assert_eq!(cell.count(), 2);
//! # Ok::<(), capmap::CapmapError>(())
//! ```

use crate::compute::validation::{non_negative_mbps, require_coordinates};
use crate::grid::{CellId, GridResolution, cell_boundary, cell_center, cell_id};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};
use geo::Polygon;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Cells keyed by id. Iteration order carries no meaning; sort with
/// [`sorted_cells`] where a stable order is needed.
pub type CellMap = FxHashMap<CellId, AggregatedCell>;

/// Ratio reported for cells with no demand: demand is fully met.
pub const FULLY_MET_RATIO: f64 = 1.0;

/// A sample that can be placed on the grid.
pub trait GridSample {
    fn entity_id(&self) -> &str;
    fn lat(&self) -> Option<f64>;
    fn lon(&self) -> Option<f64>;
    fn service_area(&self) -> &str;
    fn demand_mbps(&self) -> f64;
    /// `None` for samples that carry no allocation.
    fn allocated_mbps(&self) -> Option<f64>;
}

impl GridSample for DemandSample {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn lat(&self) -> Option<f64> {
        self.lat
    }

    fn lon(&self) -> Option<f64> {
        self.lon
    }

    fn service_area(&self) -> &str {
        &self.service_area
    }

    fn demand_mbps(&self) -> f64 {
        self.demand_mbps
    }

    fn allocated_mbps(&self) -> Option<f64> {
        None
    }
}

impl GridSample for AllocationSample {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn lat(&self) -> Option<f64> {
        self.lat
    }

    fn lon(&self) -> Option<f64> {
        self.lon
    }

    fn service_area(&self) -> &str {
        &self.service_area
    }

    fn demand_mbps(&self) -> f64 {
        self.demand_mbps
    }

    fn allocated_mbps(&self) -> Option<f64> {
        Some(self.allocated_mbps)
    }
}

/// Accumulated metrics of one grid cell.
///
/// Only this module constructs or mutates cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedCell {
    cell_id: CellId,
    service_area: String,
    sum_demand: f64,
    sum_allocated: f64,
    count: u32,
    lat: f64,
    lon: f64,
    optimality_ratio: f64,
}

impl AggregatedCell {
    fn empty(cell_id: CellId, service_area: &str) -> Self {
        let (lat, lon) = cell_center(cell_id);
        Self {
            cell_id,
            service_area: service_area.to_string(),
            sum_demand: 0.0,
            sum_allocated: 0.0,
            count: 0,
            lat,
            lon,
            optimality_ratio: FULLY_MET_RATIO,
        }
    }

    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    /// Service area of the first sample folded into this cell.
    pub fn service_area(&self) -> &str {
        &self.service_area
    }

    pub fn sum_demand(&self) -> f64 {
        self.sum_demand
    }

    pub fn sum_allocated(&self) -> f64 {
        self.sum_allocated
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Latitude of the cell center.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude of the cell center.
    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn optimality_ratio(&self) -> f64 {
        self.optimality_ratio
    }

    /// Hexagon footprint, for extruded rendering.
    pub fn boundary(&self) -> Polygon<f64> {
        cell_boundary(self.cell_id)
    }

    /// Requested capacity not covered by the allocation, never negative.
    pub fn unmet_demand(&self) -> f64 {
        (self.sum_demand - self.sum_allocated).max(0.0)
    }

    pub fn get(&self, field: CellField) -> f64 {
        match field {
            CellField::SumDemand => self.sum_demand,
            CellField::SumAllocated => self.sum_allocated,
            CellField::Count => f64::from(self.count),
            CellField::OptimalityRatio => self.optimality_ratio,
        }
    }
}

/// Numeric cell fields a range can be derived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellField {
    SumDemand,
    SumAllocated,
    Count,
    OptimalityRatio,
}

/// Cells after the accumulation pass, before ratios are derived.
#[derive(Debug, Clone, Default)]
pub struct AccumulatedCells {
    cells: CellMap,
    dropped: usize,
}

impl AccumulatedCells {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Samples skipped for missing or invalid coordinates.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Result of a full aggregation.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub cells: CellMap,
    /// Samples skipped for missing or invalid coordinates.
    pub dropped: usize,
}

impl Aggregation {
    pub fn total_count(&self) -> u64 {
        self.cells.values().map(|c| u64::from(c.count)).sum()
    }
}

/// Folds samples into cells in one pass.
///
/// Samples without valid coordinates are logged and skipped. Negative or
/// non-finite capacities count as zero.
pub fn accumulate<S: GridSample>(samples: &[S], resolution: GridResolution) -> AccumulatedCells {
    let mut cells = CellMap::default();
    let mut dropped = 0;

    for sample in samples {
        let placed = require_coordinates(sample.lat(), sample.lon())
            .and_then(|(lat, lon)| cell_id(lat, lon, resolution));
        let id = match placed {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Dropping sample for entity {}: {}", sample.entity_id(), e);
                dropped += 1;
                continue;
            }
        };

        let cell = cells
            .entry(id)
            .or_insert_with(|| AggregatedCell::empty(id, sample.service_area()));

        let (demand, clamped) = non_negative_mbps(sample.demand_mbps());
        if clamped {
            log::warn!(
                "Entity {} reported invalid demand {}; counting it as 0",
                sample.entity_id(),
                sample.demand_mbps()
            );
        }
        cell.sum_demand += demand;

        if let Some(allocated) = sample.allocated_mbps() {
            let (allocated_value, clamped) = non_negative_mbps(allocated);
            if clamped {
                log::warn!(
                    "Entity {} reported invalid allocation {}; counting it as 0",
                    sample.entity_id(),
                    allocated
                );
            }
            cell.sum_allocated += allocated_value;
        }

        cell.count += 1;
    }

    log::debug!(
        "Aggregated {} samples into {} cells at resolution {} ({} dropped)",
        samples.len(),
        cells.len(),
        resolution,
        dropped
    );

    AccumulatedCells { cells, dropped }
}

/// Derives every cell's optimality ratio from its accumulated sums.
///
/// `sum_allocated / sum_demand` when demand is positive, exactly
/// [`FULLY_MET_RATIO`] otherwise. Each cell is handled independently.
pub fn compute_optimality(accumulated: AccumulatedCells) -> Aggregation {
    let AccumulatedCells { mut cells, dropped } = accumulated;

    for cell in cells.values_mut() {
        cell.optimality_ratio = if cell.sum_demand > 0.0 {
            cell.sum_allocated / cell.sum_demand
        } else {
            FULLY_MET_RATIO
        };
    }

    Aggregation { cells, dropped }
}

/// Accumulates samples and derives optimality ratios.
pub fn aggregate<S: GridSample>(samples: &[S], resolution: GridResolution) -> Aggregation {
    compute_optimality(accumulate(samples, resolution))
}

/// Inclusive value range of one cell field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn as_domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Scans `field` across `cells`.
///
/// Empty input yields `{min: 0, max: 0}`, which is the same value all-zero
/// data produces; check the cell count to tell the two apart.
pub fn derive_range<'a, I>(cells: I, field: CellField) -> ValueRange
where
    I: IntoIterator<Item = &'a AggregatedCell>,
{
    let mut range: Option<ValueRange> = None;
    for cell in cells {
        let value = cell.get(field);
        range = Some(match range {
            Some(r) => ValueRange::new(r.min.min(value), r.max.max(value)),
            None => ValueRange::new(value, value),
        });
    }
    range.unwrap_or_default()
}

/// Cells ordered by id, for deterministic downstream output.
pub fn sorted_cells(cells: &CellMap) -> Vec<AggregatedCell> {
    let mut sorted: Vec<AggregatedCell> = cells.values().cloned().collect();
    sorted.sort_by_key(|c| u64::from(c.cell_id));
    sorted
}

/// Total demand per service area.
pub fn demand_by_service_area(samples: &[DemandSample]) -> FxHashMap<String, f64> {
    let mut totals: FxHashMap<String, f64> = FxHashMap::default();
    for sample in samples {
        let (demand, _) = non_negative_mbps(sample.demand_mbps);
        *totals.entry(sample.service_area.clone()).or_default() += demand;
    }
    totals
}

/// Total supply per service area, optionally restricted to one projection.
pub fn supply_by_service_area(
    samples: &[SupplySample],
    projection_id: Option<&str>,
) -> FxHashMap<String, f64> {
    let mut totals: FxHashMap<String, f64> = FxHashMap::default();
    for sample in samples {
        if let Some(projection) = projection_id
            && sample.projection_id != projection
        {
            continue;
        }
        let (supply, _) = non_negative_mbps(sample.supply_mbps);
        *totals.entry(sample.service_area.clone()).or_default() += supply;
    }
    totals
}
