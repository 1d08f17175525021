//! The declutter pipeline: map points to anchors, cull crowded anchors,
//! relax the surviving labels and settle them inside the plot.

mod density;
mod grid;
pub mod relax;
pub(crate) mod text;
pub(crate) mod types;

pub use density::{cull_dense, densities, density_at};
pub use relax::{LabelSimulation, Settled, SimulationState, settle};
pub use types::*;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use crate::config::Tolerances;
use crate::mapper::{AxisScale, CoordinateMapper, PlotRect};
use crate::model::ScatterPoint;
use crate::scale::{AxisDomain, ScaleMode};
use crate::theme::Theme;

/// Scale mode and domain of one axis, as the rendering surface sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpec {
    pub mode: ScaleMode,
    pub domain: AxisDomain,
}

impl AxisSpec {
    pub fn new(mode: ScaleMode, domain: AxisDomain) -> Self {
        Self { mode, domain }
    }

    pub fn scale(&self, zoom: f64) -> AxisScale {
        AxisScale::new(self.mode, self.domain.zoomed(zoom, self.mode))
    }
}

pub struct LayoutInput<'a> {
    pub generation: u64,
    pub points: &'a [ScatterPoint],
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    /// `None` until the container has been laid out.
    pub plot: Option<PlotRect>,
    pub zoom: f64,
    pub tolerances: &'a Tolerances,
    pub theme: &'a Theme,
}

struct Anchor<'p> {
    point: &'p ScatterPoint,
    pos: (f32, f32),
    radius: f32,
}

/// Run one full layout pass. Pure: identical input gives identical output.
pub fn compute_label_layout(input: &LayoutInput<'_>) -> LabelLayout {
    let started = Instant::now();
    let tol = input.tolerances;
    let Some(plot) = input.plot.filter(|plot| plot.is_usable(tol.min_plot_size)) else {
        tracing::debug!(generation = input.generation, "plot area not laid out, no labels");
        return LabelLayout::empty(input.generation, input.plot.unwrap_or_default());
    };

    let mapper = CoordinateMapper::new(
        plot,
        input.x_axis.scale(input.zoom),
        input.y_axis.scale(input.zoom),
    );
    let anchors: Vec<Anchor<'_>> = input
        .points
        .iter()
        .filter_map(|point| {
            let pos = mapper.try_map_point(point.x, point.y)?;
            plot.contains(pos).then(|| Anchor {
                point,
                pos,
                radius: tol.bubble_radius(point.normalized_z),
            })
        })
        .collect();

    let positions: Vec<(f32, f32)> = anchors.iter().map(|a| a.pos).collect();
    let density = densities(&positions, tol.collision_radius, tol.grid_threshold);

    let mut order: Vec<usize> = (0..anchors.len()).collect();
    order.sort_by(|&a, &b| {
        // Bigger bubbles first, then calmer neighbourhoods, then id.
        anchors[b]
            .point
            .normalized_z
            .partial_cmp(&anchors[a].point.normalized_z)
            .unwrap_or(Ordering::Equal)
            .then(density[a].cmp(&density[b]))
            .then_with(|| anchors[a].point.id.cmp(&anchors[b].point.id))
    });
    let keep = cull_dense(&positions, &order, tol.collision_radius, tol.density_threshold);

    let boxes: Vec<LabelBox> = order
        .iter()
        .filter(|idx| keep[**idx])
        .map(|&idx| {
            let anchor = &anchors[idx];
            let (width, height) = text::label_box_size(&anchor.point.label, input.theme, tol);
            let home_y = anchor.pos.1 - anchor.radius - tol.vertical_offset - height * 0.5;
            LabelBox {
                id: anchor.point.id.clone(),
                text: anchor.point.label.clone(),
                anchor_x: anchor.pos.0,
                anchor_y: anchor.pos.1,
                home_x: anchor.pos.0,
                home_y,
                x: anchor.pos.0,
                y: home_y,
                width,
                height,
                density: density[idx],
                gravity: anchor.point.normalized_z as f32,
            }
        })
        .collect();
    let culled = anchors.len() - boxes.len();

    let relaxed = LabelSimulation::new(boxes, tol).run();
    let settled = settle(relaxed, plot, tol);

    let labels: Vec<PlacedLabel> = settled
        .placed
        .into_iter()
        .map(|label| PlacedLabel::from_box(label, tol.leader_threshold))
        .collect();
    let labelled: HashSet<&str> = labels.iter().map(|label| label.id.as_str()).collect();
    let points: Vec<PlottedPoint> = anchors
        .iter()
        .map(|anchor| PlottedPoint {
            id: anchor.point.id.clone(),
            x: anchor.pos.0,
            y: anchor.pos.1,
            radius: anchor.radius,
            labelled: labelled.contains(anchor.point.id.as_str()),
        })
        .collect();

    let stats = LayoutStats {
        points: input.points.len(),
        anchored: anchors.len(),
        culled,
        suppressed: settled.suppressed.len(),
    };
    tracing::debug!(
        generation = input.generation,
        points = stats.points,
        anchored = stats.anchored,
        culled = stats.culled,
        suppressed = stats.suppressed,
        labels = labels.len(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "label layout pass"
    );

    LabelLayout {
        generation: input.generation,
        plot,
        mapper: Some(mapper),
        points,
        labels,
        stats,
    }
}
