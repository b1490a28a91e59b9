//! Map session: configuration, latest datasets and the recompute cycle.
//!
//! Fetching is split in two so it can run off the session's thread:
//!
//! ```rust
//! use capmap::session::{MapSession, fetch_datasets};
//! use capmap::source::MemorySource;
//! use capmap::MapConfig;
//!
//! let mut session = MapSession::new(MapConfig::default())?;
//! let source = MemorySource::new();
//!
//! let ticket = session.begin_fetch();
//! let datasets = fetch_datasets(&source, &ticket);
//! assert!(session.complete_fetch(ticket, datasets));
//! assert_eq!(session.frame().layers.len(), 1);
//! # Ok::<(), capmap::CapmapError>(())
//! ```
//!
//! A ticket is only honored while the forecast, projection and epoch it was
//! issued for are still selected.

use crate::aggregate::{
    Aggregation, CellField, ValueRange, aggregate, demand_by_service_area, derive_range,
    supply_by_service_area,
};
use crate::config::{MapConfig, ViewParams};
use crate::error::Result;
use crate::grid::GridResolution;
use crate::interaction::{InteractionState, Tooltip};
use crate::layers::{LayerDescriptor, LayerInputs, LayerKind, LayerVisibility, compose};
use crate::source::DataSource;
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Records fetched for one selection.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub demand: Vec<DemandSample>,
    pub allocation: Vec<AllocationSample>,
    pub supply: Vec<SupplySample>,
    pub coverage: Vec<CoveragePolygon>,
    pub service_areas: Vec<ServiceAreaPolygon>,
}

/// Permission to apply one fetch result.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    config: MapConfig,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Configuration the fetch should use.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }
}

fn or_empty<T>(what: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        log::error!("Failed to fetch {}: {}", what, e);
        Vec::new()
    })
}

/// Fetches everything a frame needs for the ticket's selection.
///
/// A failing fetch yields an empty dataset and an error log; the remaining
/// fetches still run.
pub fn fetch_datasets(source: &dyn DataSource, ticket: &FetchTicket) -> Datasets {
    let config = &ticket.config;
    Datasets {
        demand: or_empty(
            "demand",
            source.demand_data(Some(config.forecast_id.as_str()), config.epoch),
        ),
        allocation: or_empty(
            "allocations",
            source.allocation_data_for_experiment(
                &config.forecast_id,
                &config.projection_id,
                config.epoch,
            ),
        ),
        supply: or_empty("supply", source.supply_data(Some(config.projection_id.as_str()))),
        coverage: or_empty("coverage", source.satellite_coverage()),
        service_areas: or_empty("service areas", source.service_areas()),
    }
}

/// Output of one recompute cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderFrame {
    pub layers: Vec<LayerDescriptor>,
    /// Demand range over demand cells; `{0, 0}` when there are none.
    pub demand_range: ValueRange,
    pub demand_cell_count: usize,
    pub allocation_cell_count: usize,
    /// Samples dropped for missing or invalid coordinates.
    pub dropped_samples: usize,
    pub epoch: Option<u32>,
}

/// Owns the configuration and the derived state of one map view.
#[derive(Debug)]
pub struct MapSession {
    config: MapConfig,
    generation: u64,
    datasets: Datasets,
    demand: Aggregation,
    allocation: Aggregation,
    supply_by_area: FxHashMap<String, f64>,
    demand_by_area: FxHashMap<String, f64>,
    interaction: InteractionState,
    frame: RenderFrame,
}

impl MapSession {
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate()?;
        let mut session = Self {
            config,
            generation: 0,
            datasets: Datasets::default(),
            demand: Aggregation::default(),
            allocation: Aggregation::default(),
            supply_by_area: FxHashMap::default(),
            demand_by_area: FxHashMap::default(),
            interaction: InteractionState::new(),
            frame: RenderFrame::default(),
        };
        session.recompose();
        Ok(session)
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn demand_aggregation(&self) -> &Aggregation {
        &self.demand
    }

    pub fn allocation_aggregation(&self) -> &Aggregation {
        &self.allocation
    }

    /// Latest frame.
    pub fn frame(&self) -> &RenderFrame {
        &self.frame
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Issues a ticket for the current selection.
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket {
            generation: self.generation,
            config: self.config.clone(),
        }
    }

    /// Applies `datasets` if `ticket` is still current. Returns whether it was.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, datasets: Datasets) -> bool {
        if ticket.generation != self.generation {
            log::debug!(
                "Discarding stale fetch (generation {}, current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.datasets = datasets;
        self.supply_by_area =
            supply_by_service_area(&self.datasets.supply, Some(self.config.projection_id.as_str()));
        self.demand_by_area = demand_by_service_area(&self.datasets.demand);
        self.reaggregate();
        true
    }

    /// Fetches synchronously and applies the result.
    pub fn refresh(&mut self, source: &dyn DataSource) -> bool {
        let ticket = self.begin_fetch();
        let datasets = fetch_datasets(source, &ticket);
        self.complete_fetch(ticket, datasets)
    }

    pub fn set_forecast(&mut self, forecast_id: impl Into<String>) {
        self.config.forecast_id = forecast_id.into();
        self.invalidate();
    }

    pub fn set_projection(&mut self, projection_id: impl Into<String>) {
        self.config.projection_id = projection_id.into();
        self.invalidate();
    }

    pub fn set_epoch(&mut self, epoch: Option<u32>) -> Result<()> {
        let previous = self.config.epoch;
        self.config.epoch = epoch;
        if let Err(e) = self.config.validate() {
            self.config.epoch = previous;
            return Err(e);
        }
        self.invalidate();
        Ok(())
    }

    /// Steps to the next epoch, wrapping at the epoch count. Starts at 0 when
    /// every epoch was shown.
    pub fn advance_epoch(&mut self) -> u32 {
        let next = match self.config.epoch {
            Some(epoch) => (epoch + 1) % self.config.epoch_count,
            None => 0,
        };
        self.config.epoch = Some(next);
        self.invalidate();
        next
    }

    pub fn set_resolution(&mut self, resolution: GridResolution) -> Result<()> {
        let previous = self.config.resolution;
        self.config.resolution = resolution;
        if let Err(e) = self.config.validate() {
            self.config.resolution = previous;
            return Err(e);
        }
        self.reaggregate();
        Ok(())
    }

    pub fn set_view(&mut self, view: ViewParams) -> Result<()> {
        view.validate()?;
        self.config.view = view;
        self.recompose();
        Ok(())
    }

    pub fn set_layer_visible(&mut self, kind: LayerKind, visible: bool) {
        self.config.visibility.set(kind, visible);
        self.recompose();
    }

    pub fn toggle_layer(&mut self, kind: LayerKind) {
        self.config.visibility.toggle(kind);
        self.recompose();
    }

    pub fn visibility(&self) -> LayerVisibility {
        self.config.visibility
    }

    pub fn set_selected_satellites<I, S>(&mut self, satellites: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.selected_satellites = satellites.into_iter().map(Into::into).collect();
        self.recompose();
    }

    /// Records a hover on item `index` of layer `layer_id`, or on nothing.
    pub fn on_hover(&mut self, pick: Option<(&str, usize)>, x: f64, y: f64) {
        self.interaction.on_hover(&self.frame.layers, pick, x, y);
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.interaction.tooltip()
    }

    fn invalidate(&mut self) {
        self.generation += 1;
    }

    fn reaggregate(&mut self) {
        let resolution = self.config.resolution;
        self.demand = aggregate(&self.datasets.demand, resolution);
        self.allocation = aggregate(&self.datasets.allocation, resolution);
        self.interaction.clear();
        self.recompose();
    }

    fn recompose(&mut self) {
        let inputs = LayerInputs {
            visibility: self.config.visibility,
            view: self.config.view,
            demand_cells: &self.demand.cells,
            allocation_cells: &self.allocation.cells,
            coverage: &self.datasets.coverage,
            service_areas: &self.datasets.service_areas,
            supply_by_area: &self.supply_by_area,
            demand_by_area: &self.demand_by_area,
            selected_satellites: &self.config.selected_satellites,
        };

        self.frame = RenderFrame {
            layers: compose(&inputs),
            demand_range: derive_range(self.demand.cells.values(), CellField::SumDemand),
            demand_cell_count: self.demand.cells.len(),
            allocation_cell_count: self.allocation.cells.len(),
            dropped_samples: self.demand.dropped + self.allocation.dropped,
            epoch: self.config.epoch,
        };
        self.interaction.retain_shown(&self.frame.layers);

        log::debug!(
            "Recomputed frame: {} layers, {} demand cells, {} allocation cells",
            self.frame.layers.len(),
            self.frame.demand_cell_count,
            self.frame.allocation_cell_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapmapError;
    use crate::layers::{ALLOCATION_LAYER_ID, DEMAND_LAYER_ID, LayerData};
    use crate::source::MemorySource;

    struct FailingSource;

    impl DataSource for FailingSource {
        fn demand_data(&self, _: Option<&str>, _: Option<u32>) -> Result<Vec<DemandSample>> {
            Err(CapmapError::Other("backend unavailable".to_string()))
        }

        fn allocation_data_for_experiment(
            &self,
            _: &str,
            _: &str,
            _: Option<u32>,
        ) -> Result<Vec<AllocationSample>> {
            Err(CapmapError::Other("backend unavailable".to_string()))
        }

        fn satellite_coverage(&self) -> Result<Vec<CoveragePolygon>> {
            Ok(Vec::new())
        }

        fn service_areas(&self) -> Result<Vec<ServiceAreaPolygon>> {
            Ok(Vec::new())
        }

        fn supply_data(&self, _: Option<&str>) -> Result<Vec<SupplySample>> {
            Err(CapmapError::Other("backend unavailable".to_string()))
        }
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_demand(vec![
                DemandSample::new("a", 40.0, -100.0, "1", 30.0, 0, "base_forecast"),
                DemandSample::new("b", 40.0, -100.0, "1", 10.0, 0, "base_forecast"),
                DemandSample::new("c", 10.0, 10.0, "2", 5.0, 1, "base_forecast"),
                DemandSample::new("d", 10.0, 10.0, "2", 50.0, 0, "peak_forecast"),
            ])
            .with_supply(vec![
                SupplySample::new("baseline", "USA-SAT", "1", 20.0),
                SupplySample::new("baseline", "EU-SAT", "2", 100.0),
            ])
    }

    #[test]
    fn test_refresh_builds_frame() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        assert!(session.refresh(&source()));

        let frame = session.frame();
        assert_eq!(frame.layers.len(), 1);
        assert_eq!(frame.layers[0].id, DEMAND_LAYER_ID);
        assert_eq!(frame.demand_cell_count, 2);
        assert_eq!(frame.demand_range, ValueRange::new(5.0, 40.0));
    }

    #[test]
    fn test_stale_ticket_discarded() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        let source = source();

        let stale = session.begin_fetch();
        let stale_data = fetch_datasets(&source, &stale);
        session.set_forecast("peak_forecast");
        let current = session.begin_fetch();
        let current_data = fetch_datasets(&source, &current);

        assert!(session.complete_fetch(current, current_data));
        assert!(!session.complete_fetch(stale, stale_data));
        assert_eq!(session.datasets().demand.len(), 1);
        assert_eq!(session.datasets().demand[0].entity_id, "d");
    }

    #[test]
    fn test_display_changes_keep_ticket_valid() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        let ticket = session.begin_fetch();
        session.set_resolution(GridResolution::new(6).unwrap()).unwrap();
        session.toggle_layer(LayerKind::Coverage);
        session.set_selected_satellites(["EU-SAT"]);

        let data = fetch_datasets(&source(), &ticket);
        assert!(session.complete_fetch(ticket, data));
    }

    #[test]
    fn test_fetch_failure_yields_empty_frame() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        assert!(session.refresh(&FailingSource));

        let frame = session.frame();
        assert_eq!(frame.demand_cell_count, 0);
        assert_eq!(frame.demand_range, ValueRange::default());
        assert!(frame.layers[0].data.is_empty());
    }

    #[test]
    fn test_allocation_toggle() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        session.refresh(&source());
        session.set_layer_visible(LayerKind::Allocation, true);

        let frame = session.frame();
        assert_eq!(frame.layers.len(), 1);
        assert_eq!(frame.layers[0].id, ALLOCATION_LAYER_ID);
        assert!(!session.visibility().demand());

        let LayerData::AllocationCells(cells) = &frame.layers[0].data else {
            panic!("expected allocation cells");
        };
        let area_one = cells.iter().find(|c| c.service_area() == "1").unwrap();
        assert_eq!(area_one.sum_allocated(), 20.0);
        assert_eq!(area_one.optimality_ratio(), 0.5);
    }

    #[test]
    fn test_epoch_selection() {
        let mut session = MapSession::new(MapConfig::default().with_epoch_count(2)).unwrap();
        assert_eq!(session.advance_epoch(), 0);
        session.refresh(&source());
        assert_eq!(session.frame().demand_cell_count, 1);
        assert_eq!(session.frame().epoch, Some(0));

        assert_eq!(session.advance_epoch(), 1);
        assert_eq!(session.advance_epoch(), 0);
        assert!(session.set_epoch(Some(2)).is_err());
        assert_eq!(session.config().epoch, Some(0));
    }

    #[test]
    fn test_resolution_rejected() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        assert!(session.set_resolution(GridResolution::new(9).unwrap()).is_err());
        assert_eq!(session.config().resolution.value(), 4);
    }

    #[test]
    fn test_hover_cleared_on_new_data() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        session.refresh(&source());
        session.on_hover(Some((DEMAND_LAYER_ID, 0)), 3.0, 4.0);
        assert!(session.tooltip().is_some());

        session.refresh(&source());
        assert!(session.tooltip().is_none());
    }

    #[test]
    fn test_hover_follows_layer_visibility() {
        let mut session = MapSession::new(MapConfig::default()).unwrap();
        session.refresh(&source());
        session.on_hover(Some((DEMAND_LAYER_ID, 0)), 3.0, 4.0);

        session.set_view(ViewParams::default()).unwrap();
        assert!(session.tooltip().is_some());

        session.set_layer_visible(LayerKind::Allocation, true);
        assert_eq!(session.frame().layers[0].id, ALLOCATION_LAYER_ID);
        assert!(session.interaction().hovered().is_none());
        assert!(session.tooltip().is_none());
    }
}
