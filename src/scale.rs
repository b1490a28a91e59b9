//! Domain-to-visual-channel mappings.
//!
//! Every scale is fixed at construction and clamps its input to the domain:
//! values below `min` behave like `min`, values above `max` like `max`.
//! A degenerate domain (`min == max`) never divides by zero; it maps every
//! value to the first output.

use crate::error::{CapmapError, Result};
use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// RGBA color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub fn with_alpha(self, a: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, a])
    }

    /// Channel-wise linear blend; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mut out = [0u8; 4];
        for (i, channel) in out.iter_mut().enumerate() {
            let a = f64::from(self.0[i]);
            let b = f64::from(other.0[i]);
            *channel = (a + (b - a) * t).round() as u8;
        }
        Rgba(out)
    }
}

/// Normalizes `value` into [0, 1] against `domain`, clamping at the edges.
///
/// Returns `None` for a degenerate domain. NaN normalizes to 0.
pub fn normalize(value: f64, domain: (f64, f64)) -> Option<f64> {
    let (min, max) = domain;
    let span = max - min;
    if span == 0.0 || !span.is_finite() {
        return None;
    }
    let t = (value - min) / span;
    if t.is_nan() {
        return Some(0.0);
    }
    Some(t.clamp(0.0, 1.0))
}

/// Discrete scale picking one of an ordered list of outputs.
///
/// # Examples
///
/// ```rust
/// use capmap::scale::stepped_scale;
///
/// let scale = stepped_scale((0.0, 100.0), ["c0", "c1", "c2", "c3", "c4"])?;
/// assert_eq!(*scale.apply(0.0), "c0");
/// assert_eq!(*scale.apply(100.0), "c4");
/// assert_eq!(*scale.apply(150.0), "c4");
/// assert_eq!(*scale.apply(-10.0), "c0");
/// # Ok::<(), capmap::CapmapError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SteppedScale<T> {
    domain: (f64, f64),
    steps: SmallVec<[T; 8]>,
}

impl<T> SteppedScale<T> {
    /// `steps[floor(normalized * (len - 1))]`.
    pub fn apply(&self, value: f64) -> &T {
        let last = self.steps.len() - 1;
        let index = match normalize(value, self.domain) {
            Some(t) => ((t * last as f64).floor() as usize).min(last),
            None => 0,
        };
        &self.steps[index]
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn steps(&self) -> &[T] {
        &self.steps
    }
}

/// Builds a stepped scale. Fails when `steps` is empty.
pub fn stepped_scale<T, I>(domain: (f64, f64), steps: I) -> Result<SteppedScale<T>>
where
    I: IntoIterator<Item = T>,
{
    let steps: SmallVec<[T; 8]> = steps.into_iter().collect();
    if steps.is_empty() {
        return Err(CapmapError::InvalidInput(
            "Stepped scale needs at least one step".to_string(),
        ));
    }
    Ok(SteppedScale { domain, steps })
}

/// Continuous linear scale from a numeric domain to a numeric range.
///
/// # Examples
///
/// ```rust
/// use capmap::scale::linear_scale;
///
/// let scale = linear_scale((0.0, 10.0), (100.0, 200.0));
/// assert_eq!(scale.apply(5.0), 150.0);
/// assert_eq!(scale.apply(20.0), 200.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn apply(&self, value: f64) -> f64 {
        let (out_min, out_max) = self.range;
        match normalize(value, self.domain) {
            Some(t) => out_min + (out_max - out_min) * t,
            None => out_min,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }
}

pub fn linear_scale(domain: (f64, f64), range: (f64, f64)) -> LinearScale {
    LinearScale { domain, range }
}

/// Evenly spaced color stops with linear blending between neighbors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorRamp {
    stops: SmallVec<[Rgba; 8]>,
}

impl ColorRamp {
    pub fn new(stops: impl IntoIterator<Item = Rgba>) -> Result<Self> {
        let stops: SmallVec<[Rgba; 8]> = stops.into_iter().collect();
        if stops.is_empty() {
            return Err(CapmapError::InvalidInput(
                "Color ramp needs at least one stop".to_string(),
            ));
        }
        Ok(Self { stops })
    }

    /// Color at position `t` in [0, 1]; out-of-range `t` is clamped.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.stops.len() - 1;
        let position = t * last as f64;
        let i = position.floor() as usize;
        if i >= last {
            return self.stops[last];
        }
        self.stops[i].lerp(self.stops[i + 1], position - i as f64)
    }

    pub fn stops(&self) -> &[Rgba] {
        &self.stops
    }
}

/// Continuous color scale: clamped domain onto a [`ColorRamp`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuousColorScale {
    domain: (f64, f64),
    ramp: ColorRamp,
}

impl ContinuousColorScale {
    pub fn new(domain: (f64, f64), ramp: ColorRamp) -> Self {
        Self { domain, ramp }
    }

    pub fn apply(&self, value: f64) -> Rgba {
        self.ramp.sample(normalize(value, self.domain).unwrap_or(0.0))
    }
}

/// Demand palette, light to dark.
pub const DEMAND_STEPS: [Rgba; 6] = [
    Rgba::rgb(255, 255, 178),
    Rgba::rgb(254, 217, 118),
    Rgba::rgb(254, 178, 76),
    Rgba::rgb(253, 141, 60),
    Rgba::rgb(240, 59, 32),
    Rgba::rgb(189, 0, 38),
];

/// Unmet-demand ramp, worst (ratio 0) to nearly met.
pub const UNMET_RAMP: [Rgba; 3] = [
    Rgba::rgb(215, 25, 28),
    Rgba::rgb(253, 174, 97),
    Rgba::rgb(255, 255, 191),
];

pub const FULLY_MET_COLOR: Rgba = Rgba::rgb(26, 150, 65);

/// Elevation given to cells whose demand is fully met. Unmet cells approach
/// zero height as their ratio approaches 1.0, so anything above zero would
/// stand a fully met cell taller than a nearly met one.
pub const MIN_ELEVATION: f64 = 0.0;

/// Elevation of the worst cell before the view's elevation scale applies.
pub const MAX_ELEVATION: f64 = 50_000.0;

static SATELLITE_COLORS: Lazy<FxHashMap<&'static str, Rgba>> = Lazy::new(|| {
    let mut colors = FxHashMap::default();
    colors.insert("USA-SAT", Rgba::rgb(31, 119, 180));
    colors.insert("NA-SAT", Rgba::rgb(255, 127, 14));
    colors.insert("EU-SAT", Rgba::rgb(148, 103, 189));
    colors
});

const FALLBACK_SATELLITE_COLORS: [Rgba; 6] = [
    Rgba::rgb(44, 160, 44),
    Rgba::rgb(214, 39, 40),
    Rgba::rgb(140, 86, 75),
    Rgba::rgb(227, 119, 194),
    Rgba::rgb(188, 189, 34),
    Rgba::rgb(23, 190, 207),
];

/// Stable color for a satellite. Unknown ids hash into a fallback palette.
pub fn satellite_color(satellite_id: &str) -> Rgba {
    if let Some(color) = SATELLITE_COLORS.get(satellite_id) {
        return *color;
    }
    let mut hasher = FxHasher::default();
    satellite_id.hash(&mut hasher);
    let index = (hasher.finish() % FALLBACK_SATELLITE_COLORS.len() as u64) as usize;
    FALLBACK_SATELLITE_COLORS[index]
}

/// Color and elevation for demand cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandEncoding {
    color: SteppedScale<Rgba>,
    elevation: LinearScale,
}

impl DemandEncoding {
    /// Encodes demand over `domain`: stepped palette, elevation from 0 to
    /// `max_elevation`.
    pub fn new(domain: (f64, f64), max_elevation: f64) -> Self {
        Self {
            color: SteppedScale {
                domain,
                steps: DEMAND_STEPS.into_iter().collect(),
            },
            elevation: linear_scale(domain, (0.0, max_elevation)),
        }
    }

    pub fn color(&self, demand: f64) -> Rgba {
        *self.color.apply(demand)
    }

    pub fn elevation(&self, demand: f64) -> f64 {
        self.elevation.apply(demand)
    }
}

/// Color and elevation for allocation cells.
///
/// Ratios at or above 1.0 skip the ramp entirely: fixed color and
/// [`MIN_ELEVATION`]. Ratios below 1.0 take the ramp over [0, 1] and stand
/// `(1 - ratio) * max_elevation` tall, so the least served cells are tallest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEncoding {
    fully_met_color: Rgba,
    max_elevation: f64,
    unmet: ContinuousColorScale,
}

impl AllocationEncoding {
    pub fn new(fully_met_color: Rgba, max_elevation: f64, unmet_ramp: ColorRamp) -> Self {
        Self {
            fully_met_color,
            max_elevation,
            unmet: ContinuousColorScale::new((0.0, 1.0), unmet_ramp),
        }
    }

    /// Default palette with the given maximum elevation.
    pub fn with_max_elevation(max_elevation: f64) -> Self {
        let ramp = ColorRamp {
            stops: UNMET_RAMP.into_iter().collect(),
        };
        Self::new(FULLY_MET_COLOR, max_elevation, ramp)
    }

    pub fn is_fully_met(ratio: f64) -> bool {
        ratio >= 1.0
    }

    pub fn color(&self, ratio: f64) -> Rgba {
        if Self::is_fully_met(ratio) {
            return self.fully_met_color;
        }
        self.unmet.apply(ratio)
    }

    pub fn elevation(&self, ratio: f64) -> f64 {
        if Self::is_fully_met(ratio) {
            return MIN_ELEVATION;
        }
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.max(0.0) };
        (1.0 - ratio) * self.max_elevation
    }

    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }
}

impl Default for AllocationEncoding {
    fn default() -> Self {
        Self::with_max_elevation(MAX_ELEVATION)
    }
}
