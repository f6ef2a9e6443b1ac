//! Graph construction over skeleton pixels.
//!
//! [`PixelGraph`] is the sparse pixel adjacency the tracer walks.
//! [`NodeGraph`] is the coarser graph of traced paths between their
//! terminals, used for connectivity statistics.

use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::raster;
use crate::types::{GrayImage, PixelCoord};

/// Canonical identifier of one undirected pixel step: the smaller
/// coordinate (by `(x, y)`) comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey(pub PixelCoord, pub PixelCoord);

impl EdgeKey {
    /// Key for the step between `a` and `b`, in either direction.
    #[must_use]
    pub fn new(a: PixelCoord, b: PixelCoord) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Sparse adjacency over every set skeleton pixel.
#[derive(Debug, Clone, Default)]
pub struct PixelGraph {
    /// Pixels whose degree is not 2, in row-major order.
    pub nodes: Vec<PixelCoord>,
    /// Every set pixel in row-major order.
    pub pixels: Vec<PixelCoord>,
    /// Set 8-neighbors of every set pixel, in canonical neighbor order.
    pub adjacency: BTreeMap<PixelCoord, Vec<PixelCoord>>,
}

impl PixelGraph {
    /// Neighbors of `p`, empty if `p` is not a skeleton pixel.
    #[must_use]
    pub fn neighbors(&self, p: PixelCoord) -> &[PixelCoord] {
        self.adjacency.get(&p).map_or(&[], Vec::as_slice)
    }

    /// Number of neighbors of `p`.
    #[must_use]
    pub fn degree(&self, p: PixelCoord) -> usize {
        self.neighbors(p).len()
    }

    /// Whether `p` is a node (degree not 2).
    #[must_use]
    pub fn is_node(&self, p: PixelCoord) -> bool {
        self.adjacency.get(&p).is_some_and(|n| n.len() != 2)
    }

    /// Number of undirected pixel steps in the skeleton.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum::<usize>() / 2
    }
}

/// Build the pixel adjacency of a skeleton raster.
#[must_use]
pub fn build_graph(skeleton: &GrayImage) -> PixelGraph {
    let mut graph = PixelGraph::default();
    for p in raster::set_pixels(skeleton) {
        let neighbors: Vec<PixelCoord> = raster::set_neighbors(skeleton, p).collect();
        if neighbors.len() != 2 {
            graph.nodes.push(p);
        }
        graph.pixels.push(p);
        graph.adjacency.insert(p, neighbors);
    }
    log::debug!(
        "graph: {} pixels, {} nodes, {} steps",
        graph.pixels.len(),
        graph.nodes.len(),
        graph.edge_count(),
    );
    graph
}

/// Traced paths collapsed to their terminals.
///
/// Nodes are distinct path terminals; each path contributes one edge
/// weighted with its index in the input.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    graph: UnGraph<PixelCoord, usize>,
}

impl NodeGraph {
    /// Build from traced pixel paths. Paths with fewer than two pixels are
    /// ignored.
    #[must_use]
    pub fn from_paths(paths: &[Vec<PixelCoord>]) -> Self {
        let mut graph = UnGraph::<PixelCoord, usize>::new_undirected();
        let mut index: BTreeMap<PixelCoord, NodeIndex> = BTreeMap::new();
        let mut node_for = |p: PixelCoord, graph: &mut UnGraph<PixelCoord, usize>| {
            *index.entry(p).or_insert_with(|| graph.add_node(p))
        };
        for (i, path) in paths.iter().enumerate() {
            let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
                continue;
            };
            if path.len() < 2 {
                continue;
            }
            let a = node_for(first, &mut graph);
            let b = node_for(last, &mut graph);
            graph.add_edge(a, b, i);
        }
        Self { graph }
    }

    /// Number of distinct terminals.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of paths.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of connected components among the traced paths.
    #[must_use]
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }

    /// Terminals shared by three or more path ends (self-loops count twice).
    #[must_use]
    pub fn branch_points(&self) -> Vec<PixelCoord> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .edges(n)
                    .map(|e| if e.source() == e.target() { 2 } else { 1 })
                    .sum::<usize>()
                    >= 3
            })
            .map(|n| self.graph[n])
            .collect()
    }
}
