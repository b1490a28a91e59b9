//! Composition of render-layer descriptors.
//!
//! The compositor is a pure function of its inputs: aggregated cells,
//! footprints, per-area totals, visibility and view. It returns descriptors
//! ordered bottom to top:
//!
//! 1. service-area fills and their text labels (`supply`)
//! 2. one coverage layer per selected satellite (`coverage`)
//! 3. demand hexagons (`demand`)
//! 4. allocation hexagons (`allocation`)
//!
//! Demand and allocation hexagons are mutually exclusive. The rule is applied
//! when visibility changes ([`LayerVisibility::set`]), so the stored state
//! never has both enabled.

use crate::aggregate::{AggregatedCell, CellField, CellMap, derive_range, sorted_cells};
use crate::config::ViewParams;
use crate::scale::{AllocationEncoding, DemandEncoding, MAX_ELEVATION, Rgba, satellite_color};
use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
use geo::Centroid;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const SERVICE_AREA_LAYER_ID: &str = "service-areas";
pub const SERVICE_AREA_LABEL_LAYER_ID: &str = "service-area-labels";
pub const DEMAND_LAYER_ID: &str = "demand-hexagons";
pub const ALLOCATION_LAYER_ID: &str = "allocation-hexagons";
pub const COVERAGE_LAYER_PREFIX: &str = "coverage-";

const COVERAGE_ALPHA: u8 = 80;
const SERVICE_AREA_FILL: Rgba = Rgba::new(70, 130, 180, 40);
const SERVICE_AREA_LINE: Rgba = Rgba::new(70, 130, 180, 200);
const LABEL_COLOR: Rgba = Rgba::rgb(33, 33, 33);
const LABEL_SIZE: f64 = 12.0;

/// Toggleable layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Demand,
    Supply,
    Coverage,
    Allocation,
}

/// Visibility flags for the toggleable layers.
///
/// Fields are only changed through [`LayerVisibility::set`], which enforces
/// that demand and allocation hexagons are never both on.
///
/// # Examples
///
/// ```rust
/// use capmap::layers::{LayerKind, LayerVisibility};
///
/// let mut visibility = LayerVisibility::default();
/// assert!(visibility.demand());
///
/// visibility.set(LayerKind::Allocation, true);
/// assert!(visibility.allocation());
/// assert!(!visibility.demand());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayerVisibility {
    demand: bool,
    supply: bool,
    coverage: bool,
    allocation: bool,
}

impl LayerVisibility {
    pub fn demand(&self) -> bool {
        self.demand
    }

    pub fn supply(&self) -> bool {
        self.supply
    }

    pub fn coverage(&self) -> bool {
        self.coverage
    }

    pub fn allocation(&self) -> bool {
        self.allocation
    }

    pub fn is_visible(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Demand => self.demand,
            LayerKind::Supply => self.supply,
            LayerKind::Coverage => self.coverage,
            LayerKind::Allocation => self.allocation,
        }
    }

    /// Sets one flag. Enabling demand disables allocation and vice versa.
    pub fn set(&mut self, kind: LayerKind, visible: bool) {
        match kind {
            LayerKind::Demand => {
                self.demand = visible;
                if visible {
                    self.allocation = false;
                }
            }
            LayerKind::Allocation => {
                self.allocation = visible;
                if visible {
                    self.demand = false;
                }
            }
            LayerKind::Supply => self.supply = visible,
            LayerKind::Coverage => self.coverage = visible,
        }
    }

    /// Flips one flag under the same exclusion rule.
    pub fn toggle(&mut self, kind: LayerKind) {
        let visible = !self.is_visible(kind);
        self.set(kind, visible);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, kind: LayerKind, visible: bool) -> Self {
        self.set(kind, visible);
        self
    }
}

impl Default for LayerVisibility {
    fn default() -> Self {
        Self {
            demand: true,
            supply: false,
            coverage: false,
            allocation: false,
        }
    }
}

/// Text anchored at a service area's centroid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLabel {
    pub service_area_id: String,
    pub lat: f64,
    pub lon: f64,
    pub text: String,
}

/// Objects a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum LayerData {
    DemandCells(Vec<AggregatedCell>),
    AllocationCells(Vec<AggregatedCell>),
    Coverage(Vec<CoveragePolygon>),
    ServiceAreas(Vec<ServiceAreaPolygon>),
    Labels(Vec<TextLabel>),
}

impl LayerData {
    pub fn len(&self) -> usize {
        match self {
            LayerData::DemandCells(items) | LayerData::AllocationCells(items) => items.len(),
            LayerData::Coverage(items) => items.len(),
            LayerData::ServiceAreas(items) => items.len(),
            LayerData::Labels(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a layer maps its data onto visual channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VisualEncoding {
    Demand {
        encoding: DemandEncoding,
        extruded: bool,
        elevation_scale: f64,
    },
    Allocation {
        encoding: AllocationEncoding,
        extruded: bool,
        elevation_scale: f64,
    },
    Fill {
        fill: Rgba,
        line: Rgba,
    },
    Text {
        color: Rgba,
        size: f64,
    },
}

impl VisualEncoding {
    /// Fill color of a hexagon cell, for hexagon layers.
    pub fn cell_color(&self, cell: &AggregatedCell) -> Option<Rgba> {
        match self {
            VisualEncoding::Demand { encoding, .. } => Some(encoding.color(cell.sum_demand())),
            VisualEncoding::Allocation { encoding, .. } => {
                Some(encoding.color(cell.optimality_ratio()))
            }
            _ => None,
        }
    }

    /// Unscaled elevation of a hexagon cell, for hexagon layers.
    pub fn cell_elevation(&self, cell: &AggregatedCell) -> Option<f64> {
        match self {
            VisualEncoding::Demand { encoding, .. } => {
                Some(encoding.elevation(cell.sum_demand()))
            }
            VisualEncoding::Allocation { encoding, .. } => {
                Some(encoding.elevation(cell.optimality_ratio()))
            }
            _ => None,
        }
    }
}

/// Pointer behavior of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interaction {
    /// Layer reports hover events to the interaction state.
    pub pickable: bool,
    pub auto_highlight: bool,
}

impl Interaction {
    const HOVERABLE: Interaction = Interaction {
        pickable: true,
        auto_highlight: true,
    };

    const INERT: Interaction = Interaction {
        pickable: false,
        auto_highlight: false,
    };
}

/// One render layer, valid for a single render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDescriptor {
    pub id: String,
    pub kind: LayerKind,
    pub data: LayerData,
    pub encoding: VisualEncoding,
    pub interaction: Interaction,
}

/// Everything the compositor reads.
#[derive(Debug, Clone, Copy)]
pub struct LayerInputs<'a> {
    pub visibility: LayerVisibility,
    pub view: ViewParams,
    pub demand_cells: &'a CellMap,
    pub allocation_cells: &'a CellMap,
    pub coverage: &'a [CoveragePolygon],
    pub service_areas: &'a [ServiceAreaPolygon],
    pub supply_by_area: &'a FxHashMap<String, f64>,
    pub demand_by_area: &'a FxHashMap<String, f64>,
    pub selected_satellites: &'a BTreeSet<String>,
}

/// Label text for a service area.
///
/// - supply and demand known: `"{id}\n{supply} vs {demand}\n{±delta}"`
/// - supply only: `"{id}\n{supply}"`
/// - otherwise the bare id
///
/// Values are rounded to whole Mbps; delta is `supply - demand`.
///
/// ```rust
/// use capmap::layers::service_area_label;
///
/// assert_eq!(service_area_label("7", Some(120.0), Some(95.4)), "7\n120 vs 95\n+25");
/// assert_eq!(service_area_label("7", Some(60.0), Some(80.0)), "7\n60 vs 80\n-20");
/// assert_eq!(service_area_label("7", Some(60.0), None), "7\n60");
/// assert_eq!(service_area_label("7", None, Some(80.0)), "7");
/// ```
pub fn service_area_label(id: &str, supply: Option<f64>, demand: Option<f64>) -> String {
    match (supply, demand) {
        (Some(supply), Some(demand)) => {
            let supply = supply.round() as i64;
            let demand = demand.round() as i64;
            format!("{}\n{} vs {}\n{:+}", id, supply, demand, supply - demand)
        }
        (Some(supply), None) => format!("{}\n{}", id, supply.round() as i64),
        _ => id.to_string(),
    }
}

/// Splits coverage footprints by satellite, keeping only selected ones.
///
/// Groups come back ordered by satellite id.
pub fn coverage_by_satellite<'a>(
    coverage: &'a [CoveragePolygon],
    selected: &BTreeSet<String>,
) -> BTreeMap<&'a str, Vec<CoveragePolygon>> {
    let mut groups: BTreeMap<&str, Vec<CoveragePolygon>> = BTreeMap::new();
    for footprint in coverage {
        if !selected.contains(&footprint.satellite_id) {
            continue;
        }
        groups
            .entry(footprint.satellite_id.as_str())
            .or_default()
            .push(footprint.clone());
    }
    groups
}

fn service_area_layers(inputs: &LayerInputs<'_>, layers: &mut Vec<LayerDescriptor>) {
    layers.push(LayerDescriptor {
        id: SERVICE_AREA_LAYER_ID.to_string(),
        kind: LayerKind::Supply,
        data: LayerData::ServiceAreas(inputs.service_areas.to_vec()),
        encoding: VisualEncoding::Fill {
            fill: SERVICE_AREA_FILL,
            line: SERVICE_AREA_LINE,
        },
        interaction: Interaction::HOVERABLE,
    });

    let labels = inputs
        .service_areas
        .iter()
        .filter_map(|area| {
            let centroid = area.polygon().centroid()?;
            let id = area.service_area_id.as_str();
            Some(TextLabel {
                service_area_id: id.to_string(),
                lat: centroid.y(),
                lon: centroid.x(),
                text: service_area_label(
                    id,
                    inputs.supply_by_area.get(id).copied(),
                    inputs.demand_by_area.get(id).copied(),
                ),
            })
        })
        .collect();

    layers.push(LayerDescriptor {
        id: SERVICE_AREA_LABEL_LAYER_ID.to_string(),
        kind: LayerKind::Supply,
        data: LayerData::Labels(labels),
        encoding: VisualEncoding::Text {
            color: LABEL_COLOR,
            size: LABEL_SIZE,
        },
        interaction: Interaction::INERT,
    });
}

fn coverage_layers(inputs: &LayerInputs<'_>, layers: &mut Vec<LayerDescriptor>) {
    let groups = coverage_by_satellite(inputs.coverage, inputs.selected_satellites);
    for (satellite_id, footprints) in groups {
        let color = satellite_color(satellite_id);
        layers.push(LayerDescriptor {
            id: format!("{}{}", COVERAGE_LAYER_PREFIX, satellite_id),
            kind: LayerKind::Coverage,
            data: LayerData::Coverage(footprints),
            encoding: VisualEncoding::Fill {
                fill: color.with_alpha(COVERAGE_ALPHA),
                line: color,
            },
            interaction: Interaction::HOVERABLE,
        });
    }
}

fn demand_layer(inputs: &LayerInputs<'_>) -> LayerDescriptor {
    let range = derive_range(inputs.demand_cells.values(), CellField::SumDemand);
    LayerDescriptor {
        id: DEMAND_LAYER_ID.to_string(),
        kind: LayerKind::Demand,
        data: LayerData::DemandCells(sorted_cells(inputs.demand_cells)),
        encoding: VisualEncoding::Demand {
            encoding: DemandEncoding::new(range.as_domain(), MAX_ELEVATION),
            extruded: inputs.view.is_extruded(),
            elevation_scale: inputs.view.elevation_scale,
        },
        interaction: Interaction::HOVERABLE,
    }
}

fn allocation_layer(inputs: &LayerInputs<'_>) -> LayerDescriptor {
    LayerDescriptor {
        id: ALLOCATION_LAYER_ID.to_string(),
        kind: LayerKind::Allocation,
        data: LayerData::AllocationCells(sorted_cells(inputs.allocation_cells)),
        encoding: VisualEncoding::Allocation {
            encoding: AllocationEncoding::with_max_elevation(MAX_ELEVATION),
            extruded: inputs.view.is_extruded(),
            elevation_scale: inputs.view.elevation_scale,
        },
        interaction: Interaction::HOVERABLE,
    }
}

/// Builds the ordered layer list for one render pass.
pub fn compose(inputs: &LayerInputs<'_>) -> Vec<LayerDescriptor> {
    let visibility = inputs.visibility;
    let mut layers = Vec::new();

    if visibility.supply() {
        service_area_layers(inputs, &mut layers);
    }

    if visibility.coverage() {
        coverage_layers(inputs, &mut layers);
    }

    // Allocation takes precedence if a caller assembled both flags by hand.
    if visibility.demand() && !visibility.allocation() {
        layers.push(demand_layer(inputs));
    }

    if visibility.allocation() {
        layers.push(allocation_layer(inputs));
    }

    log::debug!(
        "Composed {} layers: [{}]",
        layers.len(),
        layers
            .iter()
            .map(|l| l.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    layers
}
