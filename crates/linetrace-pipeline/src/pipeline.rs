//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process_staged`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use linetrace_pipeline::{Bounds, GrayImage, Pipeline, PipelineConfig, PipelineError};
//! # fn run(mask: GrayImage) -> Result<(), PipelineError> {
//! let bounds = Bounds::new(0.0, 0.0, 100.0, 100.0);
//! let staged = Pipeline::new(mask, bounds, PipelineConfig::default())
//!     .skeletonize()?
//!     .build_graph()
//!     .trace()
//!     .bridge()
//!     .project()
//!     .clean()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the previously computed intermediates. Only the first
//! transition is fallible: it validates the mask, the bounds, and every
//! parameter before any work is done.

use crate::diagnostics::{StageMetrics, path_stats, total_points};
use crate::graph::{NodeGraph, PixelGraph};
use crate::skeleton::Skeleton;
use crate::types::{
    Bounds, Dimensions, GrayImage, PipelineConfig, PipelineError, PixelCoord, Polyline,
    StagedResult,
};
use crate::{bridge, graph, project, raster, simplify, skeleton, topology, trace};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`skeletonize`](Self::skeletonize) to validate the inputs and
/// advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .skeletonize() to continue"]
pub struct Pending {
    config: PipelineConfig,
    mask: GrayImage,
    bounds: Bounds,
}

impl Pending {
    /// The source mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Check the mask size, the bounds, and every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for a mask smaller than
    /// 2x2 or malformed bounds, and
    /// [`PipelineError::ParameterOutOfRange`] for a parameter outside its
    /// documented range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        PipelineConfig::validate_mask(&self.mask)?;
        self.bounds.validate()?;
        self.config.validate()
    }

    /// Validate, then thin the mask and advance to [`Skeletonized`].
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`validate`](Self::validate).
    pub fn skeletonize(self) -> Result<Skeletonized, PipelineError> {
        self.validate()?;
        let skeleton = skeleton::extract(
            &self.mask,
            self.config.structuring_element,
            self.config.spur_prune_length,
        );
        Ok(Skeletonized {
            mask_pixels: raster::count_set(&self.mask),
            dimensions: Dimensions::of(&self.mask),
            config: self.config,
            bounds: self.bounds,
            skeleton,
        })
    }

    /// Run every remaining stage and collect the intermediates.
    ///
    /// # Errors
    ///
    /// Same as [`skeletonize`](Self::skeletonize).
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self
            .skeletonize()?
            .build_graph()
            .trace()
            .bridge()
            .project()
            .clean()
            .into_result())
    }
}

// ───────────────────────── Stage 1: Skeletonized ─────────────────────

/// Pipeline state after thinning, spur pruning, and node classification.
///
/// Call [`build_graph`](Self::build_graph) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .build_graph() to continue"]
pub struct Skeletonized {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    mask_pixels: u64,
    skeleton: Skeleton,
}

impl Skeletonized {
    /// The skeleton and its classified nodes.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Advance to the graph stage.
    pub fn build_graph(self) -> Graphed {
        let graph = graph::build_graph(&self.skeleton.image);
        Graphed {
            config: self.config,
            bounds: self.bounds,
            dimensions: self.dimensions,
            skeleton: self.skeleton,
            graph,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        StageMetrics::Skeleton {
            shape: self.config.structuring_element.shape,
            size: self.config.structuring_element.size,
            spur_prune_length: self.config.spur_prune_length,
            mask_pixel_count: self.mask_pixels,
            skeleton_pixel_count: raster::count_set(&self.skeleton.image),
            endpoint_count: self.skeleton.endpoints.len(),
            junction_count: self.skeleton.junctions.len(),
        }
    }
}

// ───────────────────────── Stage 2: Graphed ──────────────────────────

/// Pipeline state after building the pixel adjacency.
///
/// Call [`trace`](Self::trace) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .trace() to continue"]
pub struct Graphed {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    skeleton: Skeleton,
    graph: PixelGraph,
}

impl Graphed {
    /// The pixel graph.
    #[must_use]
    pub const fn graph(&self) -> &PixelGraph {
        &self.graph
    }

    /// Advance to the trace stage.
    pub fn trace(self) -> Traced {
        let paths = trace::trace_paths(&self.graph);
        let node_graph = NodeGraph::from_paths(&paths);
        Traced {
            config: self.config,
            bounds: self.bounds,
            dimensions: self.dimensions,
            skeleton: self.skeleton,
            node_count: self.graph.nodes.len(),
            paths,
            node_graph,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        StageMetrics::Graph {
            pixel_count: self.graph.pixels.len(),
            node_count: self.graph.nodes.len(),
            step_count: self.graph.edge_count(),
        }
    }
}

// ───────────────────────── Stage 3: Traced ───────────────────────────

/// Pipeline state after path tracing.
///
/// Call [`bridge`](Self::bridge) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .bridge() to continue"]
pub struct Traced {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    skeleton: Skeleton,
    node_count: usize,
    paths: Vec<Vec<PixelCoord>>,
    node_graph: NodeGraph,
}

impl Traced {
    /// Traced pixel paths.
    #[must_use]
    pub fn paths(&self) -> &[Vec<PixelCoord>] {
        &self.paths
    }

    /// The paths collapsed into a graph of their terminals.
    #[must_use]
    pub const fn node_graph(&self) -> &NodeGraph {
        &self.node_graph
    }

    /// Advance to the bridge stage.
    pub fn bridge(self) -> Bridged {
        let pixel_lines = self
            .paths
            .iter()
            .map(|p| Polyline::from_pixels(p))
            .collect();
        let bridged = bridge::bridge_gaps(pixel_lines, self.config.gap_bridge_tolerance);
        Bridged {
            config: self.config,
            bounds: self.bounds,
            dimensions: self.dimensions,
            skeleton: self.skeleton,
            node_count: self.node_count,
            paths: self.paths,
            bridged,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        let stats = path_stats(self.paths.iter().map(Vec::len));
        StageMetrics::Trace {
            path_count: self.paths.len(),
            component_count: self.node_graph.component_count(),
            branch_point_count: self.node_graph.branch_points().len(),
            total_pixel_count: stats.total,
            min_path_pixels: stats.min,
            max_path_pixels: stats.max,
            mean_path_pixels: stats.mean,
        }
    }
}

// ───────────────────────── Stage 4: Bridged ──────────────────────────

/// Pipeline state after gap bridging (still in pixel space).
///
/// Call [`project`](Self::project) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .project() to continue"]
pub struct Bridged {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    skeleton: Skeleton,
    node_count: usize,
    paths: Vec<Vec<PixelCoord>>,
    bridged: Vec<Polyline>,
}

impl Bridged {
    /// Bridged paths in pixel coordinates.
    #[must_use]
    pub fn bridged(&self) -> &[Polyline] {
        &self.bridged
    }

    /// Drop paths below the minimum vertex count, project the rest into
    /// world coordinates, and advance to [`Projected`].
    pub fn project(self) -> Projected {
        let kept = project::filter_short_paths(self.bridged.clone(), self.config.min_path_length);
        let projected = project::project_lines(&kept, &self.bounds, self.dimensions);
        Projected {
            config: self.config,
            bounds: self.bounds,
            dimensions: self.dimensions,
            skeleton: self.skeleton,
            node_count: self.node_count,
            paths: self.paths,
            bridged: self.bridged,
            projected,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        StageMetrics::Bridge {
            tolerance: self.config.gap_bridge_tolerance,
            paths_before: self.paths.len(),
            paths_after: self.bridged.len(),
            joins: self.paths.len().saturating_sub(self.bridged.len()),
        }
    }
}

// ───────────────────────── Stage 5: Projected ────────────────────────

/// Pipeline state after the length filter and projection.
///
/// Call [`clean`](Self::clean) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing; call .clean() to continue"]
pub struct Projected {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    skeleton: Skeleton,
    node_count: usize,
    paths: Vec<Vec<PixelCoord>>,
    bridged: Vec<Polyline>,
    projected: Vec<Polyline>,
}

impl Projected {
    /// Kept paths in world coordinates.
    #[must_use]
    pub fn projected(&self) -> &[Polyline] {
        &self.projected
    }

    /// Run the topology cleaner (prune, snap, simplify, smooth) and
    /// advance to [`Cleaned`].
    pub fn clean(self) -> Cleaned {
        let config = &self.config;
        let pruned = topology::drop_degenerate(topology::prune_short_lines(
            self.projected.clone(),
            config.min_line_length,
        ));
        let snapped = topology::snap_endpoints(pruned.clone(), config.snap_tolerance);
        let simplified = simplify::simplify_lines(snapped.clone(), config.simplify_epsilon);
        let lines = topology::smooth_lines(simplified.clone(), config.smooth_iterations);
        log::debug!(
            "cleanup: {} -> {} (prune) -> {} (snap) -> {} (simplify) -> {} lines",
            self.projected.len(),
            pruned.len(),
            snapped.len(),
            simplified.len(),
            lines.len(),
        );
        Cleaned {
            config: self.config,
            bounds: self.bounds,
            dimensions: self.dimensions,
            skeleton: self.skeleton,
            node_count: self.node_count,
            paths: self.paths,
            bridged: self.bridged,
            projected: self.projected,
            pruned,
            snapped,
            simplified,
            lines,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        StageMetrics::Project {
            min_path_length: self.config.min_path_length,
            paths_before: self.bridged.len(),
            paths_kept: self.projected.len(),
            point_count: total_points(&self.projected),
        }
    }
}

// ───────────────────────── Stage 6: Cleaned ──────────────────────────

/// Pipeline state after topology cleanup: the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the
/// [`StagedResult`] containing all intermediates.
#[must_use = "call .into_result() to extract the StagedResult"]
pub struct Cleaned {
    config: PipelineConfig,
    bounds: Bounds,
    dimensions: Dimensions,
    skeleton: Skeleton,
    node_count: usize,
    paths: Vec<Vec<PixelCoord>>,
    bridged: Vec<Polyline>,
    projected: Vec<Polyline>,
    pruned: Vec<Polyline>,
    snapped: Vec<Polyline>,
    simplified: Vec<Polyline>,
    lines: Vec<Polyline>,
}

impl Cleaned {
    /// Final lines in world coordinates.
    #[must_use]
    pub fn lines(&self) -> &[Polyline] {
        &self.lines
    }

    /// Mask dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Consume the pipeline and return the full [`StagedResult`].
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        StagedResult {
            skeleton: self.skeleton.image,
            endpoints: self.skeleton.endpoints,
            junctions: self.skeleton.junctions,
            node_count: self.node_count,
            paths: self.paths,
            bridged: self.bridged,
            projected: self.projected,
            pruned: self.pruned,
            snapped: self.snapped,
            simplified: self.simplified,
            lines: self.lines,
            dimensions: self.dimensions,
            bounds: self.bounds,
        }
    }

    pub(crate) fn measure(&self) -> StageMetrics {
        StageMetrics::Clean {
            min_line_length: self.config.min_line_length,
            snap_tolerance: self.config.snap_tolerance,
            simplify_epsilon: self.config.simplify_epsilon,
            smooth_iterations: self.config.smooth_iterations,
            lines_before: self.projected.len(),
            after_prune: self.pruned.len(),
            after_snap: self.snapped.len(),
            after_simplify: self.simplified.len(),
            lines_after: self.lines.len(),
            points_before: total_points(&self.projected),
            points_after: total_points(&self.lines),
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental mask-to-lines pipeline.
///
/// Created via [`Pipeline::new`], which stores the mask, bounds, and
/// config without doing any processing. Each stage method consumes the
/// current state and returns the next, making it a compile-time error to
/// skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from a mask, its world bounds, and a config.
    ///
    /// No processing or validation is performed until
    /// [`.skeletonize()`](Pending::skeletonize).
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(mask: GrayImage, bounds: Bounds, config: PipelineConfig) -> Pending {
        Pending {
            config,
            mask,
            bounds,
        }
    }
}
