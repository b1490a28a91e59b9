//! Map configuration: grid, view, layer visibility and dataset selectors.
//!
//! Every field has a serde default, so a partial JSON (or TOML, with the
//! `toml` feature) document is a valid configuration.

use crate::error::{CapmapError, Result};
use crate::grid::GridResolution;
use crate::layers::LayerVisibility;
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::time::Duration;

/// 3D view parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewParams {
    /// Camera pitch in degrees; 0 is a flat top-down view.
    #[serde(default = "ViewParams::default_pitch")]
    pub pitch: f64,

    /// Multiplier the renderer applies to cell elevations.
    #[serde(default = "ViewParams::default_elevation_scale")]
    pub elevation_scale: f64,
}

impl ViewParams {
    pub const PITCH_RANGE: RangeInclusive<f64> = 0.0..=60.0;
    pub const ELEVATION_SCALE_RANGE: RangeInclusive<f64> = 1.0..=20.0;

    const fn default_pitch() -> f64 {
        45.0
    }

    const fn default_elevation_scale() -> f64 {
        5.0
    }

    /// Cells are drawn as extruded columns whenever the camera is tilted.
    pub fn is_extruded(&self) -> bool {
        self.pitch > 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if !Self::PITCH_RANGE.contains(&self.pitch) {
            return Err(CapmapError::InvalidInput(format!(
                "pitch must be within [0, 60], got: {}",
                self.pitch
            )));
        }
        if !Self::ELEVATION_SCALE_RANGE.contains(&self.elevation_scale) {
            return Err(CapmapError::InvalidInput(format!(
                "elevation_scale must be within [1, 20], got: {}",
                self.elevation_scale
            )));
        }
        Ok(())
    }
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            pitch: Self::default_pitch(),
            elevation_scale: Self::default_elevation_scale(),
        }
    }
}

/// Full configuration surface of a map session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapConfig {
    #[serde(default)]
    pub resolution: GridResolution,

    #[serde(default)]
    pub view: ViewParams,

    #[serde(default)]
    pub visibility: LayerVisibility,

    /// Satellites whose coverage footprints are drawn.
    #[serde(default)]
    pub selected_satellites: BTreeSet<String>,

    #[serde(default = "MapConfig::default_forecast_id")]
    pub forecast_id: String,

    #[serde(default = "MapConfig::default_projection_id")]
    pub projection_id: String,

    /// Active epoch; `None` shows every epoch at once.
    #[serde(default)]
    pub epoch: Option<u32>,

    /// Number of hourly epochs in the analysis window.
    #[serde(default = "MapConfig::default_epoch_count")]
    pub epoch_count: u32,

    #[serde(default = "MapConfig::default_playback_interval_ms")]
    pub playback_interval_ms: u64,
}

impl MapConfig {
    fn default_forecast_id() -> String {
        "base_forecast".to_string()
    }

    fn default_projection_id() -> String {
        "baseline".to_string()
    }

    const fn default_epoch_count() -> u32 {
        24
    }

    const fn default_playback_interval_ms() -> u64 {
        1000
    }

    pub fn with_resolution(mut self, resolution: GridResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_view(mut self, view: ViewParams) -> Self {
        self.view = view;
        self
    }

    pub fn with_visibility(mut self, visibility: LayerVisibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_selected_satellites<I, S>(mut self, satellites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_satellites = satellites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_forecast(mut self, forecast_id: impl Into<String>) -> Self {
        self.forecast_id = forecast_id.into();
        self
    }

    pub fn with_projection(mut self, projection_id: impl Into<String>) -> Self {
        self.projection_id = projection_id.into();
        self
    }

    pub fn with_epoch(mut self, epoch: Option<u32>) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_epoch_count(mut self, epoch_count: u32) -> Self {
        assert!(epoch_count > 0, "Epoch count must be greater than zero");
        self.epoch_count = epoch_count;
        self
    }

    pub fn with_playback_interval(mut self, interval: Duration) -> Self {
        self.playback_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn playback_interval(&self) -> Duration {
        Duration::from_millis(self.playback_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.resolution.is_supported() {
            return Err(CapmapError::InvalidInput(format!(
                "resolution must be within [{}, {}], got: {}",
                GridResolution::SUPPORTED.start(),
                GridResolution::SUPPORTED.end(),
                self.resolution
            )));
        }

        self.view.validate()?;

        if self.visibility.demand() && self.visibility.allocation() {
            return Err(CapmapError::InvalidInput(
                "demand and allocation layers cannot both be visible".to_string(),
            ));
        }

        if self.forecast_id.is_empty() {
            return Err(CapmapError::InvalidInput(
                "forecast_id must not be empty".to_string(),
            ));
        }

        if self.projection_id.is_empty() {
            return Err(CapmapError::InvalidInput(
                "projection_id must not be empty".to_string(),
            ));
        }

        if self.epoch_count == 0 {
            return Err(CapmapError::InvalidInput(
                "epoch_count must be greater than zero".to_string(),
            ));
        }

        if let Some(epoch) = self.epoch
            && epoch >= self.epoch_count
        {
            return Err(CapmapError::InvalidInput(format!(
                "epoch {} is outside the {}-epoch window",
                epoch, self.epoch_count
            )));
        }

        if self.playback_interval_ms == 0 {
            return Err(CapmapError::InvalidInput(
                "playback_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: MapConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: MapConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            resolution: GridResolution::default(),
            view: ViewParams::default(),
            visibility: LayerVisibility::default(),
            selected_satellites: BTreeSet::new(),
            forecast_id: Self::default_forecast_id(),
            projection_id: Self::default_projection_id(),
            epoch: None,
            epoch_count: Self::default_epoch_count(),
            playback_interval_ms: Self::default_playback_interval_ms(),
        }
    }
}
