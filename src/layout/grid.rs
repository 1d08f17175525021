use std::collections::HashMap;

use super::types::Rect;

/// Uniform grid broad phase for overlap and neighbour queries.
pub(crate) struct SpatialGrid {
    cell: f32,
    /// Maps grid cell (ix, iy) to indices of the rects touching it.
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialGrid {
    pub(crate) fn new(cell: f32, rects: &[Rect]) -> Self {
        let mut grid = Self {
            cell: cell.max(8.0),
            cells: HashMap::new(),
        };
        for (idx, rect) in rects.iter().enumerate() {
            grid.insert(idx, rect);
        }
        grid
    }

    /// Grid over points, each treated as a zero-size rect.
    pub(crate) fn from_points(cell: f32, points: &[(f32, f32)]) -> Self {
        let rects: Vec<Rect> = points.iter().map(|p| (p.0, p.1, 0.0, 0.0)).collect();
        Self::new(cell, &rects)
    }

    pub(crate) fn insert(&mut self, idx: usize, rect: &Rect) {
        let (x0, y0, x1, y1) = self.span(rect);
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(idx);
            }
        }
    }

    /// Indices of rects that may overlap `rect`, ascending and unique.
    pub(crate) fn query(&self, rect: &Rect) -> Vec<usize> {
        let (x0, y0, x1, y1) = self.span(rect);
        let mut out: Vec<usize> = Vec::new();
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                if let Some(indices) = self.cells.get(&(ix, iy)) {
                    out.extend_from_slice(indices);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub(crate) fn query_radius(&self, center: (f32, f32), radius: f32) -> Vec<usize> {
        self.query(&(
            center.0 - radius,
            center.1 - radius,
            radius * 2.0,
            radius * 2.0,
        ))
    }

    fn span(&self, rect: &Rect) -> (i32, i32, i32, i32) {
        (
            (rect.0 / self.cell).floor() as i32,
            (rect.1 / self.cell).floor() as i32,
            ((rect.0 + rect.2) / self.cell).floor() as i32,
            ((rect.1 + rect.3) / self.cell).floor() as i32,
        )
    }
}
