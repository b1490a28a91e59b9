//! Hexagonal aggregation and layer composition for satellite capacity maps.
//!
//! Point samples of demand and allocated capacity are binned into H3 cells,
//! mapped onto color and elevation scales and composed into ordered render
//! layer descriptors for a multi-layer map renderer.
//!
//! ```rust
//! use capmap::prelude::*;
//!
//! let samples = vec![
//!     DemandSample::new("a", 40.71, -74.00, "1", 120.0, 0, "base_forecast"),
//!     DemandSample::new("b", 40.7101, -74.0001, "1", 80.0, 0, "base_forecast"),
//! ];
//! let result = aggregate(&samples, GridResolution::new(4)?);
//! assert_eq!(result.cells.len(), 1);
//!
//! let range = derive_range(result.cells.values(), CellField::SumDemand);
//! assert_eq!(range.max, 200.0);
//! # Ok::<(), capmap::CapmapError>(())
//! ```

pub mod aggregate;
pub mod allocation;
pub mod compute;
pub mod config;
pub mod error;
pub mod grid;
pub mod interaction;
pub mod layers;
pub mod playback;
pub mod scale;
pub mod session;
pub mod source;

pub use aggregate::{
    AccumulatedCells, AggregatedCell, Aggregation, CellField, CellMap, GridSample, ValueRange,
    accumulate, aggregate, compute_optimality, derive_range,
};
pub use config::{MapConfig, ViewParams};
pub use error::{CapmapError, Result};
pub use grid::{CellId, GridResolution, cell_boundary, cell_center, cell_id};
pub use interaction::{HoveredEntity, InteractionState, Tooltip};
pub use layers::{LayerDescriptor, LayerKind, LayerVisibility, compose};
pub use playback::Playback;
pub use scale::{AllocationEncoding, DemandEncoding, Rgba, linear_scale, stepped_scale};
pub use session::{MapSession, RenderFrame};
pub use source::{DataSource, JsonFileSource, MemorySource};

pub use capmap_types::polygon::{CoveragePolygon, ServiceAreaPolygon};
pub use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{CapmapError, Result};

    pub use crate::{AllocationSample, DemandSample, SupplySample};

    pub use crate::{CoveragePolygon, ServiceAreaPolygon};

    pub use crate::{CellField, GridResolution, aggregate, derive_range};

    pub use crate::{LayerKind, LayerVisibility, MapConfig, MapSession};

    pub use crate::{DataSource, JsonFileSource, MemorySource};
}
