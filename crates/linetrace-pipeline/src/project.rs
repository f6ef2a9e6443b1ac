//! Length filtering and projection of pixel paths into world coordinates.

use crate::types::{Bounds, Dimensions, Polyline};

/// Keep paths with at least `min_vertices` vertices.
#[must_use]
pub fn filter_short_paths(paths: Vec<Polyline>, min_vertices: usize) -> Vec<Polyline> {
    let before = paths.len();
    let kept: Vec<Polyline> = paths
        .into_iter()
        .filter(|p| p.len() >= min_vertices)
        .collect();
    log::debug!(
        "kept {} of {before} paths with at least {min_vertices} vertices",
        kept.len(),
    );
    kept
}

/// Map every vertex through [`Bounds::to_world`].
#[must_use]
pub fn project_lines(paths: &[Polyline], bounds: &Bounds, dimensions: Dimensions) -> Vec<Polyline> {
    paths
        .iter()
        .map(|path| {
            Polyline::new(
                path.points()
                    .iter()
                    .map(|&p| bounds.to_world(p, dimensions))
                    .collect(),
            )
        })
        .collect()
}
