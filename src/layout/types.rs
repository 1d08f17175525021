use crate::mapper::{CoordinateMapper, PlotRect};

/// `(x, y, width, height)` with `(x, y)` the top-left corner.
pub type Rect = (f32, f32, f32, f32);

/// A label during layout. Size is fixed at creation; `x`/`y` (the centre)
/// move while the simulator owns the box.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    pub id: String,
    pub text: String,
    pub anchor_x: f32,
    pub anchor_y: f32,
    /// Resting centre: above the point, clear of its bubble.
    pub home_x: f32,
    pub home_y: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub density: usize,
    /// Normalized bubble size, used to weight the restoring force.
    pub gravity: f32,
}

impl LabelBox {
    pub fn rect(&self) -> Rect {
        (
            self.x - self.width * 0.5,
            self.y - self.height * 0.5,
            self.width,
            self.height,
        )
    }

    pub fn padded_rect(&self, pad: f32) -> Rect {
        inflate_rect(self.rect(), pad)
    }

    /// Distance of the current centre from the resting centre.
    pub fn displacement(&self) -> f32 {
        (self.x - self.home_x).hypot(self.y - self.home_y)
    }
}

/// Frozen label descriptor handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub id: String,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
    /// Draw a line back to the anchor; off for negligible displacement.
    pub leader: bool,
}

impl PlacedLabel {
    pub fn from_box(label: LabelBox, leader_threshold: f32) -> Self {
        let leader = label.displacement() > leader_threshold;
        Self {
            id: label.id,
            text: label.text,
            x: label.x,
            y: label.y,
            width: label.width,
            height: label.height,
            anchor_x: label.anchor_x,
            anchor_y: label.anchor_y,
            leader,
        }
    }

    pub fn rect(&self) -> Rect {
        (
            self.x - self.width * 0.5,
            self.y - self.height * 0.5,
            self.width,
            self.height,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlottedPoint {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub labelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutStats {
    /// Qualifying scatter points handed to the pass.
    pub points: usize,
    /// Points whose anchor landed inside the plot rectangle.
    pub anchored: usize,
    /// Labels dropped before simulation for local density.
    pub culled: usize,
    /// Labels dropped after relaxation.
    pub suppressed: usize,
}

/// Result of one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub generation: u64,
    pub plot: PlotRect,
    /// `None` when the plot rectangle was unusable.
    pub mapper: Option<CoordinateMapper>,
    pub points: Vec<PlottedPoint>,
    pub labels: Vec<PlacedLabel>,
    pub stats: LayoutStats,
}

impl LabelLayout {
    pub fn empty(generation: u64, plot: PlotRect) -> Self {
        Self {
            generation,
            plot,
            mapper: None,
            points: Vec::new(),
            labels: Vec::new(),
            stats: LayoutStats::default(),
        }
    }

    pub fn label(&self, id: &str) -> Option<&PlacedLabel> {
        self.labels.iter().find(|label| label.id == id)
    }
}

pub(crate) fn overlap_area(a: &Rect, b: &Rect) -> f32 {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = (a.0 + a.2).min(b.0 + b.2);
    let y1 = (a.1 + a.3).min(b.1 + b.3);
    let w = (x1 - x0).max(0.0);
    let h = (y1 - y0).max(0.0);
    w * h
}

pub(crate) fn inflate_rect(rect: Rect, pad: f32) -> Rect {
    if pad <= 0.0 {
        return rect;
    }
    (
        rect.0 - pad,
        rect.1 - pad,
        rect.2 + pad * 2.0,
        rect.3 + pad * 2.0,
    )
}
