//! Anchor density: how crowded the neighbourhood of each label anchor is.

use super::grid::SpatialGrid;

/// Number of other anchors strictly closer than `radius` to `anchors[index]`.
pub fn density_at(anchors: &[(f32, f32)], index: usize, radius: f32) -> usize {
    let Some(&center) = anchors.get(index) else {
        return 0;
    };
    anchors
        .iter()
        .enumerate()
        .filter(|(other, point)| *other != index && within(center, **point, radius))
        .count()
}

/// Density of every anchor. Above `grid_threshold` anchors the neighbour
/// search goes through a spatial grid; the counts are identical.
pub fn densities(anchors: &[(f32, f32)], radius: f32, grid_threshold: usize) -> Vec<usize> {
    if radius <= 0.0 {
        return vec![0; anchors.len()];
    }
    if anchors.len() <= grid_threshold {
        return (0..anchors.len())
            .map(|idx| density_at(anchors, idx, radius))
            .collect();
    }
    let grid = SpatialGrid::from_points(radius, anchors);
    anchors
        .iter()
        .enumerate()
        .map(|(idx, center)| {
            grid.query_radius(*center, radius)
                .into_iter()
                .filter(|other| *other != idx && within(*center, anchors[*other], radius))
                .count()
        })
        .collect()
}

/// Walk anchors in `order` and keep each one unless `threshold` already-kept
/// anchors lie within `radius` of it. Returns a keep flag per anchor; anchors
/// absent from `order` are dropped. A `threshold` of 0 keeps everything in
/// `order`.
pub fn cull_dense(anchors: &[(f32, f32)], order: &[usize], radius: f32, threshold: usize) -> Vec<bool> {
    let mut keep = vec![false; anchors.len()];
    let mut kept: Vec<usize> = Vec::with_capacity(order.len());
    for &idx in order {
        if idx >= anchors.len() {
            continue;
        }
        if threshold > 0 && radius > 0.0 {
            let crowd = kept
                .iter()
                .filter(|other| within(anchors[idx], anchors[**other], radius))
                .count();
            if crowd >= threshold {
                continue;
            }
        }
        keep[idx] = true;
        kept.push(idx);
    }
    keep
}

fn within(a: (f32, f32), b: (f32, f32), radius: f32) -> bool {
    (a.0 - b.0).hypot(a.1 - b.1) < radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_excludes_self_and_uses_strict_radius() {
        let anchors = [(0.0, 0.0), (3.0, 4.0), (0.0, 4.9), (100.0, 0.0)];
        assert_eq!(density_at(&anchors, 0, 5.0), 1);
        assert_eq!(density_at(&anchors, 3, 5.0), 0);
        assert_eq!(density_at(&anchors, 9, 5.0), 0);
    }

    #[test]
    fn coincident_anchors_count_each_other() {
        let anchors = [(10.0, 10.0); 3];
        assert_eq!(densities(&anchors, 5.0, 100), vec![2, 2, 2]);
    }

    #[test]
    fn grid_and_brute_force_agree() {
        let anchors: Vec<(f32, f32)> = (0..60)
            .map(|i| (((i * 37) % 113) as f32 * 3.0, ((i * 53) % 97) as f32 * 2.0))
            .collect();
        assert_eq!(densities(&anchors, 25.0, 1000), densities(&anchors, 25.0, 0));
    }

    #[test]
    fn zero_radius_means_no_neighbours() {
        assert_eq!(densities(&[(0.0, 0.0), (0.0, 0.0)], 0.0, 10), vec![0, 0]);
    }

    #[test]
    fn culling_keeps_at_most_threshold_per_neighbourhood() {
        let anchors = [(0.0, 0.0), (0.4, 0.0), (0.8, 0.0), (50.0, 50.0)];
        let keep = cull_dense(&anchors, &[0, 1, 2, 3], 5.0, 2);
        assert_eq!(keep, vec![true, true, false, true]);
    }

    #[test]
    fn culling_follows_priority_order() {
        let anchors = [(0.0, 0.0), (1.0, 0.0)];
        assert_eq!(cull_dense(&anchors, &[1, 0], 5.0, 1), vec![false, true]);
        assert_eq!(cull_dense(&anchors, &[1, 0], 5.0, 0), vec![true, true]);
    }
}
