//! Path tracing: turn the pixel graph into one pixel sequence per chain.
//!
//! Every undirected pixel step is consumed by exactly one path. Output
//! order depends only on the graph, so identical skeletons always trace
//! to identical path lists.

use std::collections::BTreeSet;

use crate::graph::{EdgeKey, PixelGraph};
use crate::types::PixelCoord;

/// Walk from `start` through `first` until a node, a dead end, or an
/// already consumed step.
fn walk(
    graph: &PixelGraph,
    start: PixelCoord,
    first: PixelCoord,
    visited: &mut BTreeSet<EdgeKey>,
) -> Vec<PixelCoord> {
    visited.insert(EdgeKey::new(start, first));
    let mut path = vec![start, first];
    let (mut prev, mut current) = (start, first);
    while !graph.is_node(current) {
        let Some(&next) = graph.neighbors(current).iter().find(|&&n| n != prev) else {
            break;
        };
        if !visited.insert(EdgeKey::new(current, next)) {
            break;
        }
        path.push(next);
        prev = current;
        current = next;
    }
    path
}

/// Trace every skeleton chain into a pixel path.
///
/// Nodes are visited in row-major order and their neighbors in canonical
/// order. A second pass starts from the first pixel (row-major) of each
/// closed loop that contains no node, so every step of every skeleton is
/// covered. Returned paths have at least two pixels.
#[must_use]
pub fn trace_paths(graph: &PixelGraph) -> Vec<Vec<PixelCoord>> {
    let mut visited = BTreeSet::new();
    let mut paths = Vec::new();

    for &node in &graph.nodes {
        for &first in graph.neighbors(node) {
            if visited.contains(&EdgeKey::new(node, first)) {
                continue;
            }
            paths.push(walk(graph, node, first, &mut visited));
        }
    }
    let from_nodes = paths.len();

    for &pixel in &graph.pixels {
        if graph.is_node(pixel) {
            continue;
        }
        for &first in graph.neighbors(pixel) {
            if visited.contains(&EdgeKey::new(pixel, first)) {
                continue;
            }
            paths.push(walk(graph, pixel, first, &mut visited));
        }
    }

    paths.retain(|p| p.len() >= 2);
    log::debug!(
        "traced {} paths ({} closed loops without nodes)",
        paths.len(),
        paths.len().saturating_sub(from_nodes),
    );
    paths
}
