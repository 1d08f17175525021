//! Data space ⇄ screen space mapping shared by the renderer and the label
//! layout engine.

use serde::{Deserialize, Serialize};

use crate::scale::{AxisDomain, ScaleMode};

/// Pixel rectangle of the plot area. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PlotRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x && point.0 <= self.right() && point.1 >= self.y && point.1 <= self.bottom()
    }

    /// A container that has not been laid out yet reports a zero or tiny size.
    pub fn is_usable(&self, min_size: f32) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= min_size.max(1.0)
            && self.height >= min_size.max(1.0)
    }
}

/// One axis of the mapping: a scale mode over a concrete, valid domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisScale {
    mode: ScaleMode,
    low: f64,
    high: f64,
}

impl AxisScale {
    pub fn new(mode: ScaleMode, domain: AxisDomain) -> Self {
        let (low, high) = domain.resolve(mode);
        Self { mode, low, high }
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.low, self.high)
    }

    /// Position of `value` along the axis as a fraction of its length, or
    /// `None` when the value cannot be placed on this scale.
    pub fn fraction(&self, value: f64) -> Option<f64> {
        if !self.mode.accepts(value) {
            return None;
        }
        let t = match self.mode {
            // Halved so spans near f64::MAX stay finite.
            ScaleMode::Linear => {
                (value * 0.5 - self.low * 0.5) / (self.high * 0.5 - self.low * 0.5)
            }
            ScaleMode::Log => {
                let lo = self.low.log10();
                (value.log10() - lo) / (self.high.log10() - lo)
            }
        };
        t.is_finite().then_some(t)
    }

    /// Inverse of [`AxisScale::fraction`].
    pub fn value_at(&self, fraction: f64) -> f64 {
        match self.mode {
            ScaleMode::Linear => self.low + fraction * (self.high * 0.5 - self.low * 0.5) * 2.0,
            ScaleMode::Log => {
                let lo = self.low.log10();
                10f64.powf(lo + fraction * (self.high.log10() - lo))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    plot: PlotRect,
    x: AxisScale,
    y: AxisScale,
}

impl CoordinateMapper {
    pub fn new(plot: PlotRect, x: AxisScale, y: AxisScale) -> Self {
        Self { plot, x, y }
    }

    pub fn plot(&self) -> PlotRect {
        self.plot
    }

    pub fn x_scale(&self) -> &AxisScale {
        &self.x
    }

    pub fn y_scale(&self) -> &AxisScale {
        &self.y
    }

    /// Fails closed to the left edge when `value` has no position on the axis.
    pub fn map_x(&self, value: f64) -> f32 {
        match self.x.fraction(value) {
            Some(t) => (self.plot.x as f64 + t * self.plot.width as f64) as f32,
            None => self.plot.x,
        }
    }

    /// Data "up" is pixel "up": the axis origin is the bottom edge.
    pub fn map_y(&self, value: f64) -> f32 {
        match self.y.fraction(value) {
            Some(t) => (self.plot.bottom() as f64 - t * self.plot.height as f64) as f32,
            None => self.plot.bottom(),
        }
    }

    pub fn map_point(&self, x: f64, y: f64) -> (f32, f32) {
        (self.map_x(x), self.map_y(y))
    }

    /// Like [`CoordinateMapper::map_point`], but reports unplaceable values
    /// instead of collapsing them onto the origin.
    pub fn try_map_point(&self, x: f64, y: f64) -> Option<(f32, f32)> {
        let tx = self.x.fraction(x)?;
        let ty = self.y.fraction(y)?;
        Some((
            (self.plot.x as f64 + tx * self.plot.width as f64) as f32,
            (self.plot.bottom() as f64 - ty * self.plot.height as f64) as f32,
        ))
    }

    pub fn invert_x(&self, px: f32) -> f64 {
        let width = (self.plot.width as f64).max(f64::EPSILON);
        self.x.value_at((px - self.plot.x) as f64 / width)
    }

    pub fn invert_y(&self, py: f32) -> f64 {
        let height = (self.plot.height as f64).max(f64::EPSILON);
        self.y.value_at((self.plot.bottom() - py) as f64 / height)
    }

    pub fn invert_point(&self, point: (f32, f32)) -> (f64, f64) {
        (self.invert_x(point.0), self.invert_y(point.1))
    }
}
