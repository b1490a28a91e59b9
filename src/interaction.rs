//! Hover tracking and tooltip content.

use crate::aggregate::AggregatedCell;
use crate::layers::{LayerData, LayerDescriptor};
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use serde::Serialize;

/// The entity under the pointer, tagged by what it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum HoveredEntity {
    DemandCell(AggregatedCell),
    AllocationCell(AggregatedCell),
    Coverage(CoveragePolygon),
    ServiceArea(ServiceAreaPolygon),
}

impl HoveredEntity {
    /// Looks up item `index` of layer `layer_id`.
    ///
    /// Returns `None` for unknown layers, out-of-range indices and layers that
    /// are not pickable.
    pub fn resolve(layers: &[LayerDescriptor], layer_id: &str, index: usize) -> Option<Self> {
        let layer = layers.iter().find(|l| l.id == layer_id)?;
        if !layer.interaction.pickable {
            return None;
        }
        match &layer.data {
            LayerData::DemandCells(cells) => cells.get(index).cloned().map(Self::DemandCell),
            LayerData::AllocationCells(cells) => {
                cells.get(index).cloned().map(Self::AllocationCell)
            }
            LayerData::Coverage(polygons) => polygons.get(index).cloned().map(Self::Coverage),
            LayerData::ServiceAreas(areas) => areas.get(index).cloned().map(Self::ServiceArea),
            LayerData::Labels(_) => None,
        }
    }

    /// Whether a pickable layer in `layers` still carries this entity.
    pub fn is_shown_in(&self, layers: &[LayerDescriptor]) -> bool {
        layers
            .iter()
            .filter(|layer| layer.interaction.pickable)
            .any(|layer| match (&layer.data, self) {
                (LayerData::DemandCells(cells), HoveredEntity::DemandCell(cell))
                | (LayerData::AllocationCells(cells), HoveredEntity::AllocationCell(cell)) => {
                    cells.contains(cell)
                }
                (LayerData::Coverage(polygons), HoveredEntity::Coverage(footprint)) => {
                    polygons.contains(footprint)
                }
                (LayerData::ServiceAreas(areas), HoveredEntity::ServiceArea(area)) => {
                    areas.contains(area)
                }
                _ => false,
            })
    }

    pub fn tooltip(&self) -> Tooltip {
        match self {
            HoveredEntity::DemandCell(cell) => Tooltip {
                title: format!("Cell {}", cell.cell_id()),
                rows: vec![
                    TooltipRow::new("Service area", cell.service_area()),
                    TooltipRow::new("Demand", format_mbps(cell.sum_demand())),
                    TooltipRow::new("Entities", cell.count().to_string()),
                ],
            },
            HoveredEntity::AllocationCell(cell) => Tooltip {
                title: format!("Cell {}", cell.cell_id()),
                rows: vec![
                    TooltipRow::new("Service area", cell.service_area()),
                    TooltipRow::new("Demand", format_mbps(cell.sum_demand())),
                    TooltipRow::new("Allocated", format_mbps(cell.sum_allocated())),
                    TooltipRow::new(
                        "Optimality",
                        format!("{:.1}%", cell.optimality_ratio() * 100.0),
                    ),
                    TooltipRow::new("Unmet", format_mbps(cell.unmet_demand())),
                    TooltipRow::new("Entities", cell.count().to_string()),
                ],
            },
            HoveredEntity::Coverage(footprint) => Tooltip {
                title: footprint.satellite_id.clone(),
                rows: vec![
                    TooltipRow::new("Service area", footprint.service_area.as_str()),
                    TooltipRow::new("Beam", footprint.center_id.to_string()),
                ],
            },
            HoveredEntity::ServiceArea(area) => Tooltip {
                title: format!("Service area {}", area.service_area_id),
                rows: Vec::new(),
            },
        }
    }
}

fn format_mbps(value: f64) -> String {
    format!("{:.1} Mbps", value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TooltipRow {
    pub label: String,
    pub value: String,
}

impl TooltipRow {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

/// Tooltip content for the hovered entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub title: String,
    pub rows: Vec<TooltipRow>,
}

impl Tooltip {
    /// Plain-text rendering, one `label: value` row per line.
    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for row in &self.rows {
            text.push('\n');
            text.push_str(&row.label);
            text.push_str(": ");
            text.push_str(&row.value);
        }
        text
    }
}

/// Pointer position and the single hovered entity, shared by every layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionState {
    pointer_x: f64,
    pointer_y: f64,
    hovered: Option<HoveredEntity>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer(&self) -> (f64, f64) {
        (self.pointer_x, self.pointer_y)
    }

    pub fn hovered(&self) -> Option<&HoveredEntity> {
        self.hovered.as_ref()
    }

    /// Records a hover event. `None` clears the hovered entity.
    pub fn set_hovered(&mut self, x: f64, y: f64, entity: Option<HoveredEntity>) {
        self.pointer_x = x;
        self.pointer_y = y;
        self.hovered = entity;
    }

    /// Records a hover reported as (layer id, item index) against the
    /// layers of the current frame.
    pub fn on_hover(
        &mut self,
        layers: &[LayerDescriptor],
        pick: Option<(&str, usize)>,
        x: f64,
        y: f64,
    ) {
        let entity = pick.and_then(|(layer_id, index)| {
            let resolved = HoveredEntity::resolve(layers, layer_id, index);
            if resolved.is_none() {
                log::debug!("Ignoring hover on {}[{}]", layer_id, index);
            }
            resolved
        });
        self.set_hovered(x, y, entity);
    }

    pub fn clear(&mut self) {
        self.hovered = None;
    }

    /// Drops the hovered entity once no layer in `layers` renders it.
    pub fn retain_shown(&mut self, layers: &[LayerDescriptor]) {
        if self
            .hovered
            .as_ref()
            .is_some_and(|entity| !entity.is_shown_in(layers))
        {
            log::debug!("Hovered entity no longer rendered, clearing");
            self.hovered = None;
        }
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        self.hovered.as_ref().map(HoveredEntity::tooltip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CellMap, aggregate};
    use crate::config::ViewParams;
    use crate::grid::GridResolution;
    use crate::layers::{
        ALLOCATION_LAYER_ID, DEMAND_LAYER_ID, LayerInputs, LayerKind, LayerVisibility,
        SERVICE_AREA_LABEL_LAYER_ID, SERVICE_AREA_LAYER_ID, compose,
    };
    use capmap_types::sample::{AllocationSample, DemandSample};
    use geo::polygon;
    use rustc_hash::FxHashMap;
    use std::collections::BTreeSet;

    fn compose_with(
        visibility: LayerVisibility,
        demand: &CellMap,
        allocation: &CellMap,
        areas: &[ServiceAreaPolygon],
    ) -> Vec<LayerDescriptor> {
        let totals = FxHashMap::default();
        let selected = BTreeSet::new();
        compose(&LayerInputs {
            visibility,
            view: ViewParams::default(),
            demand_cells: demand,
            allocation_cells: allocation,
            coverage: &[],
            service_areas: areas,
            supply_by_area: &totals,
            demand_by_area: &totals,
            selected_satellites: &selected,
        })
    }

    fn cells() -> (CellMap, CellMap) {
        let res = GridResolution::new(3).unwrap();
        let demand = aggregate(
            &[DemandSample::new("a", 48.0, 11.0, "EUROPE", 25.0, 0, "base_forecast")],
            res,
        );
        let allocation = aggregate(
            &[AllocationSample::new("a", 48.0, 11.0, "EUROPE", 25.0, 20.0, 0)],
            res,
        );
        (demand.cells, allocation.cells)
    }

    #[test]
    fn test_hover_demand_cell() {
        let (demand, allocation) = cells();
        let layers = compose_with(LayerVisibility::default(), &demand, &allocation, &[]);

        let mut state = InteractionState::new();
        state.on_hover(&layers, Some((DEMAND_LAYER_ID, 0)), 10.0, 20.0);

        assert_eq!(state.pointer(), (10.0, 20.0));
        assert!(matches!(state.hovered(), Some(HoveredEntity::DemandCell(_))));

        let tooltip = state.tooltip().unwrap();
        assert!(tooltip.to_text().contains("Demand: 25.0 Mbps"));
        assert!(!tooltip.to_text().contains("Optimality"));
    }

    #[test]
    fn test_hover_allocation_cell() {
        let (demand, allocation) = cells();
        let visibility = LayerVisibility::default().with(LayerKind::Allocation, true);
        let layers = compose_with(visibility, &demand, &allocation, &[]);

        let mut state = InteractionState::new();
        state.on_hover(&layers, Some((ALLOCATION_LAYER_ID, 0)), 1.0, 1.0);

        let tooltip = state.tooltip().unwrap();
        assert_eq!(tooltip.rows[2].value, "20.0 Mbps");
        assert_eq!(tooltip.rows[3].value, "80.0%");
    }

    #[test]
    fn test_hover_nothing_clears() {
        let (demand, allocation) = cells();
        let layers = compose_with(LayerVisibility::default(), &demand, &allocation, &[]);

        let mut state = InteractionState::new();
        state.on_hover(&layers, Some((DEMAND_LAYER_ID, 0)), 0.0, 0.0);
        assert!(state.hovered().is_some());

        state.on_hover(&layers, None, 5.0, 5.0);
        assert!(state.hovered().is_none());
        assert!(state.tooltip().is_none());
        assert_eq!(state.pointer(), (5.0, 5.0));
    }

    #[test]
    fn test_hover_replaces_previous_entity() {
        let (demand, allocation) = cells();
        let area = ServiceAreaPolygon::new(
            "EUROPE",
            polygon![(x: 0.0, y: 40.0), (x: 20.0, y: 40.0), (x: 20.0, y: 55.0), (x: 0.0, y: 40.0)],
        );
        let visibility = LayerVisibility::default().with(LayerKind::Supply, true);
        let layers = compose_with(visibility, &demand, &allocation, &[area]);

        let mut state = InteractionState::new();
        state.on_hover(&layers, Some((DEMAND_LAYER_ID, 0)), 0.0, 0.0);
        state.on_hover(&layers, Some((SERVICE_AREA_LAYER_ID, 0)), 0.0, 0.0);

        match state.hovered() {
            Some(HoveredEntity::ServiceArea(area)) => assert_eq!(area.service_area_id, "EUROPE"),
            other => panic!("unexpected hover {:?}", other),
        }
        assert_eq!(state.tooltip().unwrap().title, "Service area EUROPE");
    }

    #[test]
    fn test_unpickable_and_unknown_layers() {
        let (demand, allocation) = cells();
        let area = ServiceAreaPolygon::new(
            "EUROPE",
            polygon![(x: 0.0, y: 40.0), (x: 20.0, y: 40.0), (x: 20.0, y: 55.0), (x: 0.0, y: 40.0)],
        );
        let visibility = LayerVisibility::default().with(LayerKind::Supply, true);
        let layers = compose_with(visibility, &demand, &allocation, &[area]);

        assert!(HoveredEntity::resolve(&layers, SERVICE_AREA_LABEL_LAYER_ID, 0).is_none());
        assert!(HoveredEntity::resolve(&layers, "coverage-EU-SAT", 0).is_none());
        assert!(HoveredEntity::resolve(&layers, DEMAND_LAYER_ID, 7).is_none());
    }

    #[test]
    fn test_hover_dropped_when_layer_hidden() {
        let (demand, allocation) = cells();
        let layers = compose_with(LayerVisibility::default(), &demand, &allocation, &[]);

        let mut state = InteractionState::new();
        state.on_hover(&layers, Some((DEMAND_LAYER_ID, 0)), 0.0, 0.0);
        state.retain_shown(&layers);
        assert!(state.hovered().is_some());

        let visibility = LayerVisibility::default().with(LayerKind::Allocation, true);
        let layers = compose_with(visibility, &demand, &allocation, &[]);
        state.retain_shown(&layers);
        assert!(state.hovered().is_none());
        assert!(state.tooltip().is_none());
    }

    #[test]
    fn test_coverage_tooltip() {
        let footprint = CoveragePolygon::new(
            "EU-SAT",
            "EUROPE",
            3,
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)],
        );
        let tooltip = HoveredEntity::Coverage(footprint).tooltip();
        assert_eq!(tooltip.to_text(), "EU-SAT\nService area: EUROPE\nBeam: 3");
    }

    #[test]
    fn test_hovered_entity_tag() {
        let (demand, _) = cells();
        let cell = demand.values().next().unwrap().clone();
        let json = serde_json::to_value(HoveredEntity::DemandCell(cell)).unwrap();
        assert_eq!(json["kind"], "demand_cell");
    }
}
