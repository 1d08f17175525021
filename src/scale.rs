//! Value normalization and axis domain calculation for linear and log axes.

use serde::{Deserialize, Serialize};

/// Floor applied before taking the log of a value, so zero and negative
/// values still land on a log scale instead of poisoning it with `-inf`.
pub const LOG_FLOOR: f64 = 1e-6;

/// Multiplicative padding applied to both ends of a log domain.
pub const LOG_DOMAIN_FACTOR: f64 = 1.5;

const DOMAIN_PAD_FRACTION: f64 = 0.1;
const DOMAIN_MIN_PAD: f64 = 1e-9;
const DEGENERATE_MIN_PAD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Linear,
    Log,
}

impl ScaleMode {
    /// Whether `value` can be placed on an axis using this scale.
    pub fn accepts(self, value: f64) -> bool {
        value.is_finite() && (self == ScaleMode::Linear || value > 0.0)
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::Linear => "linear",
            ScaleMode::Log => "log",
        }
    }
}

/// Map `values` onto `[0, 1]`, one output per input.
///
/// Non-finite inputs map to `0`. A set whose finite values are all equal maps
/// uniformly to `0.5`. Under log scaling, non-positive finite values are
/// floored to [`LOG_FLOOR`] rather than rejected; when no value is positive the
/// whole set takes the degenerate path.
pub fn normalize_values(values: &[f64], mode: ScaleMode) -> Vec<f64> {
    let transformed: Vec<Option<f64>> = match mode {
        ScaleMode::Linear => values
            .iter()
            .map(|value| value.is_finite().then_some(*value))
            .collect(),
        ScaleMode::Log => {
            if !values.iter().any(|value| value.is_finite() && *value > 0.0) {
                return degenerate_values(values);
            }
            values
                .iter()
                .map(|value| value.is_finite().then(|| value.max(LOG_FLOOR).log10()))
                .collect()
        }
    };

    let Some((min, max)) = finite_extent(transformed.iter().flatten().copied()) else {
        return vec![0.0; values.len()];
    };
    let span = max - min;
    if span <= 0.0 {
        return degenerate_values(values);
    }
    transformed
        .iter()
        .map(|value| match value {
            Some(v) => ((v - min) / span).clamp(0.0, 1.0),
            None => 0.0,
        })
        .collect()
}

fn degenerate_values(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|value| if value.is_finite() { 0.5 } else { 0.0 })
        .collect()
}

pub(crate) fn finite_extent(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|value| value.is_finite())
        .fold(None, |acc, value| match acc {
            None => Some((value, value)),
            Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
        })
}

/// An axis domain, or the request to let the rendering surface size the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisDomain {
    Auto,
    Fixed { low: f64, high: f64 },
}

impl AxisDomain {
    /// Validated constructor: `low < high`, both finite, both positive on log.
    pub fn fixed(low: f64, high: f64, mode: ScaleMode) -> Option<Self> {
        if !low.is_finite() || !high.is_finite() || low >= high {
            return None;
        }
        if mode == ScaleMode::Log && low <= 0.0 {
            return None;
        }
        Some(AxisDomain::Fixed { low, high })
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, AxisDomain::Auto)
    }

    /// Concrete bounds, falling back to a unit window for [`AxisDomain::Auto`].
    pub fn resolve(&self, mode: ScaleMode) -> (f64, f64) {
        match (*self, mode) {
            (AxisDomain::Fixed { low, high }, _) => (low, high),
            (AxisDomain::Auto, ScaleMode::Linear) => (0.0, 1.0),
            (AxisDomain::Auto, ScaleMode::Log) => (1.0, 10.0),
        }
    }

    /// Shrink (`factor > 1`) or grow (`factor < 1`) the domain about its centre.
    /// Log domains zoom in exponent space.
    pub fn zoomed(self, factor: f64, mode: ScaleMode) -> Self {
        let AxisDomain::Fixed { low, high } = self else {
            return self;
        };
        if !factor.is_finite() || factor <= 0.0 || factor == 1.0 {
            return self;
        }
        let zoomed = match mode {
            ScaleMode::Linear => {
                let center = low * 0.5 + high * 0.5;
                let half = (high * 0.5 - low * 0.5) / factor;
                (center - half, center + half)
            }
            ScaleMode::Log => {
                let (lo, hi) = (low.log10(), high.log10());
                let center = (lo + hi) * 0.5;
                let half = (hi - lo) * 0.5 / factor;
                (10f64.powf(center - half), 10f64.powf(center + half))
            }
        };
        AxisDomain::fixed(zoomed.0, zoomed.1, mode).unwrap_or(self)
    }
}

/// Compute a padded domain for the values that `mode` can place.
///
/// This must see exactly the values that survived point filtering, otherwise
/// the mapped anchors disagree with what was rendered.
pub fn compute_domain(values: &[f64], mode: ScaleMode) -> AxisDomain {
    let Some((min, max)) = finite_extent(values.iter().copied().filter(|v| mode.accepts(*v)))
    else {
        return AxisDomain::Auto;
    };
    match mode {
        ScaleMode::Linear => {
            let pad = if min == max {
                (DOMAIN_PAD_FRACTION * min.abs()).max(DEGENERATE_MIN_PAD)
            } else {
                (DOMAIN_PAD_FRACTION * (max - min)).max(DOMAIN_MIN_PAD)
            };
            padded_domain(min, max, min - pad, max + pad, mode)
        }
        ScaleMode::Log => {
            padded_domain(min, max, min / LOG_DOMAIN_FACTOR, max * LOG_DOMAIN_FACTOR, mode)
        }
    }
}

/// Each bound whose padding overflowed falls back to the raw extent.
fn padded_domain(min: f64, max: f64, low: f64, high: f64, mode: ScaleMode) -> AxisDomain {
    let low = if low.is_finite() { low } else { min };
    let high = if high.is_finite() { high } else { max };
    AxisDomain::fixed(low, high, mode).unwrap_or(AxisDomain::Auto)
}
