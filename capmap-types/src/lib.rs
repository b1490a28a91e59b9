//! # capmap-types
//!
//! Wire types for satellite-network telemetry consumed by the capmap pipeline.
//!
//! - **Samples**: `DemandSample`, `AllocationSample`, `SupplySample`
//! - **Footprints**: `CoveragePolygon`, `ServiceAreaPolygon`
//!
//! Field names serialize in snake_case, matching the mock dataset files.
//! Sample coordinates are optional so that records with missing positions
//! survive deserialization and can be dropped (with a diagnostic) at
//! aggregation time instead of failing the whole file.
//!
//! ## Examples
//!
//! ```rust
//! use capmap_types::sample::DemandSample;
//!
//! let sample = DemandSample::new("a1b2c3d4", 40.7, -74.0, "AMERICAS", 18.5, 3, "base_forecast");
//! assert_eq!(sample.coordinates(), Some((40.7, -74.0)));
//! ```

pub mod polygon;
pub mod sample;
