//! Force-directed label relaxation.
//!
//! Every pass starts fresh from the anchors: labels begin at their home
//! position (above their point), overlapping pairs push each other apart
//! along the line between their centres, and a spring pulls every label back
//! home. The spring weakens linearly to nothing by the final iteration. The
//! simulation runs a fixed number of iterations so latency is
//! bounded; whatever still collides afterwards is suppressed in
//! [`settle`], never drawn overlapping.
//!
//! Overlap detection is pairwise, O(n²) per iteration. Above
//! `Tolerances::grid_threshold` labels a [`SpatialGrid`] prunes the pairs;
//! forces are the same either way.

use crate::config::Tolerances;
use crate::mapper::PlotRect;

use super::grid::SpatialGrid;
use super::types::{LabelBox, Rect, overlap_area};

/// Centres closer than this are treated as coincident.
const COINCIDENT_EPS: f32 = 1e-3;
const GOLDEN_ANGLE: f32 = 2.399_963;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Initialized,
    Relaxing { iteration: usize },
    Settled,
}

pub struct LabelSimulation<'a> {
    boxes: Vec<LabelBox>,
    velocity: Vec<(f32, f32)>,
    tolerances: &'a Tolerances,
    state: SimulationState,
}

impl<'a> LabelSimulation<'a> {
    /// Place every box at its home position.
    pub fn new(mut boxes: Vec<LabelBox>, tolerances: &'a Tolerances) -> Self {
        for label in &mut boxes {
            label.x = label.home_x;
            label.y = label.home_y;
        }
        let velocity = vec![(0.0, 0.0); boxes.len()];
        let state = if boxes.is_empty() || tolerances.iterations == 0 {
            SimulationState::Settled
        } else {
            SimulationState::Initialized
        };
        Self {
            boxes,
            velocity,
            tolerances,
            state,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn boxes(&self) -> &[LabelBox] {
        &self.boxes
    }

    /// Advance one iteration. Returns `false` once settled.
    pub fn step(&mut self) -> bool {
        let iteration = match self.state {
            SimulationState::Settled => return false,
            SimulationState::Initialized => 0,
            SimulationState::Relaxing { iteration } => iteration,
        };

        let tol = self.tolerances;
        // The restoring pull fades to zero over the run, so the last
        // iterations only separate labels and cannot drag them back into
        // each other.
        let cooling = 1.0 - (iteration + 1) as f32 / tol.iterations.max(1) as f32;
        let forces = self.forces(cooling);
        for (idx, label) in self.boxes.iter_mut().enumerate() {
            let (fx, fy) = forces[idx];
            let (vx, vy) = self.velocity[idx];
            let mut step = (vx * tol.damping + fx, vy * tol.damping + fy);
            let len = step.0.hypot(step.1);
            if len > tol.max_step && len > 0.0 {
                let scale = tol.max_step / len;
                step = (step.0 * scale, step.1 * scale);
            }
            self.velocity[idx] = step;
            label.x += step.0;
            label.y += step.1;
        }

        let next = iteration + 1;
        self.state = if next >= tol.iterations {
            SimulationState::Settled
        } else {
            SimulationState::Relaxing { iteration: next }
        };
        self.state != SimulationState::Settled
    }

    /// Run the remaining iterations and hand the boxes back.
    pub fn run(mut self) -> Vec<LabelBox> {
        while self.step() {}
        tracing::trace!(
            labels = self.boxes.len(),
            iterations = self.tolerances.iterations,
            "relaxation settled"
        );
        self.boxes
    }

    fn forces(&self, cooling: f32) -> Vec<(f32, f32)> {
        let tol = self.tolerances;
        let mut forces = vec![(0.0f32, 0.0f32); self.boxes.len()];

        for (i, j) in self.overlapping_pairs() {
            let (a, b) = (&self.boxes[i], &self.boxes[j]);
            let dx = a.x - b.x;
            let dy = a.y - b.y;
            let dist = dx.hypot(dy);
            let (ux, uy, magnitude) = if dist < COINCIDENT_EPS {
                let angle = coincident_angle(i, j);
                (angle.cos(), angle.sin(), tol.max_step * 0.5)
            } else {
                (dx / dist, dy / dist, tol.force_strength / dist)
            };
            let crowd = (a.density + b.density) as f32 * 0.5;
            let push = magnitude * (1.0 + tol.density_weight * crowd) * 0.5;
            forces[i].0 += ux * push;
            forces[i].1 += uy * push;
            forces[j].0 -= ux * push;
            forces[j].1 -= uy * push;
        }

        for (force, label) in forces.iter_mut().zip(&self.boxes) {
            let pull = tol.anchor_strength * cooling * (1.0 + tol.size_gravity * label.gravity);
            force.0 += (label.home_x - label.x) * pull;
            force.1 += (label.home_y - label.y) * pull;
        }
        forces
    }

    /// Pairs `(i, j)`, `i < j`, whose padded rects overlap, in ascending order.
    fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let pad = self.tolerances.overlap_padding;
        let rects: Vec<Rect> = self.boxes.iter().map(|b| b.padded_rect(pad)).collect();
        let mut pairs = Vec::new();
        if rects.len() <= self.tolerances.grid_threshold {
            for i in 0..rects.len() {
                for j in (i + 1)..rects.len() {
                    if overlap_area(&rects[i], &rects[j]) > 0.0 {
                        pairs.push((i, j));
                    }
                }
            }
            return pairs;
        }

        let cell = rects
            .iter()
            .map(|r| r.2.max(r.3))
            .fold(0.0f32, f32::max)
            .max(16.0);
        let grid = SpatialGrid::new(cell, &rects);
        for (i, rect) in rects.iter().enumerate() {
            for j in grid.query(rect) {
                if j > i && overlap_area(rect, &rects[j]) > 0.0 {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}

/// Deterministic push direction for labels stacked on the same centre, so
/// a cluster fans out instead of moving as one.
fn coincident_angle(i: usize, j: usize) -> f32 {
    ((i * 7 + j * 13) % 360) as f32 * GOLDEN_ANGLE
}

/// Outcome of settling relaxed boxes against the plot.
#[derive(Debug, Default)]
pub struct Settled {
    pub placed: Vec<LabelBox>,
    pub suppressed: Vec<LabelBox>,
}

/// Clamp relaxed boxes inside `plot`, then accept them in priority order
/// (the order of `boxes`), suppressing any box that
/// - cannot fit inside the plot at all,
/// - drifted further than `max_displacement` from home,
/// - would join a neighbourhood already holding `density_threshold` labels, or
/// - still overlaps an accepted box (padded rects).
pub fn settle(boxes: Vec<LabelBox>, plot: PlotRect, tolerances: &Tolerances) -> Settled {
    let pad = tolerances.overlap_padding;
    let mut settled = Settled::default();
    let mut accepted: Vec<Rect> = Vec::new();
    let mut centers: Vec<(f32, f32)> = Vec::new();
    // Broad phase for large inputs: accepted rects and centres are indexed
    // as they are accepted, so each check only visits nearby labels.
    let indexed = boxes.len() > tolerances.grid_threshold;
    let cell = boxes
        .iter()
        .map(|b| b.width.max(b.height) + 2.0 * pad)
        .fold(tolerances.collision_radius, f32::max)
        .max(16.0);
    let mut rect_grid = SpatialGrid::new(cell, &[]);
    let mut center_grid = SpatialGrid::new(cell, &[]);

    for mut label in boxes {
        let Some((x, y)) = clamp_center_to_plot(&label, plot, tolerances.plot_margin) else {
            settled.suppressed.push(label);
            continue;
        };
        label.x = x;
        label.y = y;

        if label.displacement() > tolerances.max_displacement {
            settled.suppressed.push(label);
            continue;
        }
        if tolerances.density_threshold > 0 && tolerances.collision_radius > 0.0 {
            let near = |c: &(f32, f32)| (c.0 - x).hypot(c.1 - y) < tolerances.collision_radius;
            let crowd = if indexed {
                center_grid
                    .query_radius((x, y), tolerances.collision_radius)
                    .into_iter()
                    .filter(|&idx| near(&centers[idx]))
                    .count()
            } else {
                centers.iter().filter(|c| near(c)).count()
            };
            if crowd >= tolerances.density_threshold {
                settled.suppressed.push(label);
                continue;
            }
        }
        let rect = label.padded_rect(pad);
        let overlaps = if indexed {
            rect_grid
                .query(&rect)
                .into_iter()
                .any(|idx| overlap_area(&rect, &accepted[idx]) > 0.0)
        } else {
            accepted.iter().any(|other| overlap_area(&rect, other) > 0.0)
        };
        if overlaps {
            settled.suppressed.push(label);
            continue;
        }
        if indexed {
            rect_grid.insert(accepted.len(), &rect);
            center_grid.insert(centers.len(), &(x, y, 0.0, 0.0));
        }
        accepted.push(rect);
        centers.push((x, y));
        settled.placed.push(label);
    }
    settled
}

/// Centre that keeps the whole box inside `plot` less `margin`, or `None` if
/// the box is larger than the plot.
fn clamp_center_to_plot(label: &LabelBox, plot: PlotRect, margin: f32) -> Option<(f32, f32)> {
    let half_w = label.width * 0.5 + margin;
    let half_h = label.height * 0.5 + margin;
    let (min_x, max_x) = (plot.x + half_w, plot.right() - half_w);
    let (min_y, max_y) = (plot.y + half_h, plot.bottom() - half_h);
    if max_x < min_x || max_y < min_y || !label.x.is_finite() || !label.y.is_finite() {
        return None;
    }
    Some((label.x.clamp(min_x, max_x), label.y.clamp(min_y, max_y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(id: &str, home: (f32, f32), width: f32) -> LabelBox {
        LabelBox {
            id: id.to_string(),
            text: id.to_string(),
            anchor_x: home.0,
            anchor_y: home.1 + 12.0,
            home_x: home.0,
            home_y: home.1,
            x: 0.0,
            y: 0.0,
            width,
            height: 14.0,
            density: 0,
            gravity: 0.0,
        }
    }

    fn plot() -> PlotRect {
        PlotRect::new(0.0, 0.0, 400.0, 300.0)
    }

    #[test]
    fn empty_input_is_settled_without_iterating() {
        let tol = Tolerances::standard();
        let mut sim = LabelSimulation::new(Vec::new(), &tol);
        assert_eq!(sim.state(), SimulationState::Settled);
        assert!(!sim.step());
        assert!(sim.run().is_empty());
    }

    #[test]
    fn state_machine_walks_through_relaxing() {
        let mut tol = Tolerances::standard();
        tol.iterations = 3;
        let mut sim = LabelSimulation::new(vec![label("A", (50.0, 50.0), 30.0)], &tol);
        assert_eq!(sim.state(), SimulationState::Initialized);
        assert!(sim.step());
        assert_eq!(sim.state(), SimulationState::Relaxing { iteration: 1 });
        assert!(sim.step());
        assert!(!sim.step());
        assert_eq!(sim.state(), SimulationState::Settled);
    }

    #[test]
    fn lone_label_stays_home() {
        let tol = Tolerances::standard();
        let out = LabelSimulation::new(vec![label("A", (50.0, 38.0), 30.0)], &tol).run();
        assert_eq!((out[0].x, out[0].y), (50.0, 38.0));
    }

    #[test]
    fn overlapping_labels_are_pushed_apart() {
        let tol = Tolerances::standard();
        let boxes = vec![label("A", (100.0, 100.0), 40.0), label("B", (110.0, 102.0), 40.0)];
        let out = LabelSimulation::new(boxes, &tol).run();
        let gap = overlap_area(
            &out[0].padded_rect(tol.overlap_padding),
            &out[1].padded_rect(tol.overlap_padding),
        );
        assert_eq!(gap, 0.0, "labels still overlap: {:?}", out);
        assert!(out[0].x < out[1].x);
    }

    #[test]
    fn coincident_labels_fan_out_deterministically() {
        let tol = Tolerances::standard();
        let boxes = vec![
            label("A", (200.0, 150.0), 30.0),
            label("B", (200.0, 150.0), 30.0),
            label("C", (200.0, 150.0), 30.0),
        ];
        let first = LabelSimulation::new(boxes.clone(), &tol).run();
        let second = LabelSimulation::new(boxes, &tol).run();
        assert_eq!(first, second);
        assert!(first[0].displacement() > 0.0);
        assert_ne!((first[0].x, first[0].y), (first[1].x, first[1].y));
    }

    #[test]
    fn crowded_pairs_push_harder_with_density_weight() {
        let separation = |density_weight: f32| {
            let mut tol = Tolerances::standard();
            tol.density_weight = density_weight;
            let mut a = label("A", (100.0, 100.0), 40.0);
            let mut b = label("B", (140.0, 100.0), 40.0);
            a.density = 4;
            b.density = 4;
            let mut sim = LabelSimulation::new(vec![a, b], &tol);
            sim.step();
            sim.boxes()[1].x - sim.boxes()[0].x
        };
        let plain = separation(0.0);
        let weighted = separation(0.15);
        assert!((plain - 43.0).abs() < 1e-4, "got {plain}");
        assert!((weighted - 44.8).abs() < 1e-4, "got {weighted}");
    }

    #[test]
    fn larger_bubbles_pull_their_labels_home_harder() {
        let tol = Tolerances::standard();
        let light = label("light", (100.0, 100.0), 20.0);
        let mut heavy = label("heavy", (300.0, 100.0), 20.0);
        heavy.gravity = 1.0;
        let mut sim = LabelSimulation::new(vec![light, heavy], &tol);
        sim.boxes[0].x += 20.0;
        sim.boxes[1].x += 20.0;
        sim.step();
        let light_left = sim.boxes()[0].x - 100.0;
        let heavy_left = sim.boxes()[1].x - 300.0;
        assert!(light_left < 20.0);
        assert!(heavy_left < light_left, "light {light_left}, heavy {heavy_left}");
    }

    #[test]
    fn grid_broad_phase_matches_pairwise() {
        let boxes: Vec<LabelBox> = (0..40)
            .map(|i| {
                label(
                    &format!("L{i}"),
                    (60.0 + (i % 8) as f32 * 25.0, 60.0 + (i / 8) as f32 * 12.0),
                    36.0,
                )
            })
            .collect();
        let pairwise = Tolerances::standard();
        let mut gridded = Tolerances::standard();
        gridded.grid_threshold = 0;
        let a = LabelSimulation::new(boxes.clone(), &pairwise);
        let b = LabelSimulation::new(boxes, &gridded);
        assert_eq!(a.overlapping_pairs(), b.overlapping_pairs());
    }

    #[test]
    fn indexed_settle_matches_linear_scan() {
        let boxes: Vec<LabelBox> = (0..60)
            .map(|i| {
                let home = (30.0 + (i % 10) as f32 * 33.0, 30.0 + (i / 10) as f32 * 19.0);
                let mut b = label(&format!("L{i}"), home, 30.0 + (i % 4) as f32 * 6.0);
                b.x = home.0 + (i % 3) as f32 * 4.0;
                b.y = home.1 - (i % 5) as f32 * 2.0;
                b
            })
            .collect();
        let linear = Tolerances::standard();
        let mut indexed = Tolerances::standard();
        indexed.grid_threshold = 0;
        let a = settle(boxes.clone(), plot(), &linear);
        let b = settle(boxes, plot(), &indexed);
        assert!(!a.placed.is_empty() && !a.suppressed.is_empty());
        assert_eq!(a.placed, b.placed);
        assert_eq!(a.suppressed, b.suppressed);
    }

    #[test]
    fn settle_clamps_into_plot() {
        let tol = Tolerances::standard();
        let mut edge = label("A", (2.0, 2.0), 30.0);
        edge.x = 2.0;
        edge.y = 2.0;
        let out = settle(vec![edge], plot(), &tol);
        let placed = &out.placed[0];
        assert_eq!(placed.x, 15.0 + tol.plot_margin);
        assert_eq!(placed.y, 7.0 + tol.plot_margin);
    }

    #[test]
    fn settle_suppresses_instead_of_overlapping() {
        let tol = Tolerances::standard();
        let mut a = label("A", (100.0, 100.0), 40.0);
        let mut b = label("B", (105.0, 100.0), 40.0);
        (a.x, a.y) = (100.0, 100.0);
        (b.x, b.y) = (105.0, 100.0);
        let out = settle(vec![a, b], plot(), &tol);
        assert_eq!(out.placed.len(), 1);
        assert_eq!(out.placed[0].id, "A");
        assert_eq!(out.suppressed[0].id, "B");
    }

    #[test]
    fn settle_suppresses_far_displaced_and_oversized_labels() {
        let tol = Tolerances::standard();
        let mut far = label("far", (100.0, 100.0), 20.0);
        (far.x, far.y) = (100.0 + tol.max_displacement + 1.0, 100.0);
        let mut huge = label("huge", (200.0, 150.0), 500.0);
        (huge.x, huge.y) = (200.0, 150.0);
        let out = settle(vec![far, huge], plot(), &tol);
        assert!(out.placed.is_empty());
        assert_eq!(out.suppressed.len(), 2);
    }
}
