//! Pipeline diagnostics: timing, counts, and parameters for each stage.
//!
//! [`process_staged_with_diagnostics`] drives the typed stages from
//! [`crate::pipeline`] and records how long each transition took along
//! with the counts the stage produced (nodes, paths, lines before and
//! after cleanup).
//!
//! Timestamps come from a caller-supplied [`Clock`], keeping this crate
//! free of any particular time source.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::types::{
    Bounds, GrayImage, KernelShape, PipelineConfig, PipelineError, Polyline, StagedResult,
};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Validation, thinning, spur pruning, node classification.
    pub skeleton: StageDiagnostics,
    /// Pixel adjacency construction.
    pub graph: StageDiagnostics,
    /// Path tracing.
    pub trace: StageDiagnostics,
    /// Gap bridging.
    pub bridge: StageDiagnostics,
    /// Minimum-length filter and projection.
    pub project: StageDiagnostics,
    /// Prune, snap, simplify, smooth.
    pub clean: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Thinning metrics.
    Skeleton {
        /// Structuring element shape.
        shape: KernelShape,
        /// Structuring element size.
        size: u32,
        /// Spur pruning limit in pixels.
        spur_prune_length: usize,
        /// Set pixels in the binarized mask.
        mask_pixel_count: u64,
        /// Set pixels in the final skeleton.
        skeleton_pixel_count: u64,
        /// Degree-1 pixels.
        endpoint_count: usize,
        /// Degree-3+ pixels.
        junction_count: usize,
    },
    /// Graph construction metrics.
    Graph {
        /// Skeleton pixels in the graph.
        pixel_count: usize,
        /// Pixels whose degree is not 2.
        node_count: usize,
        /// Undirected pixel steps.
        step_count: usize,
    },
    /// Path tracing metrics.
    Trace {
        /// Number of traced paths.
        path_count: usize,
        /// Connected components of the node graph.
        component_count: usize,
        /// Terminals shared by three or more paths.
        branch_point_count: usize,
        /// Pixels across all paths (shared nodes counted per path).
        total_pixel_count: usize,
        /// Shortest path in pixels.
        min_path_pixels: usize,
        /// Longest path in pixels.
        max_path_pixels: usize,
        /// Mean pixels per path.
        mean_path_pixels: f64,
    },
    /// Gap bridging metrics.
    Bridge {
        /// Bridging tolerance in pixels.
        tolerance: f64,
        /// Paths before bridging.
        paths_before: usize,
        /// Paths after bridging.
        paths_after: usize,
        /// Joins performed.
        joins: usize,
    },
    /// Filter and projection metrics.
    Project {
        /// Minimum vertex count.
        min_path_length: usize,
        /// Paths before filtering.
        paths_before: usize,
        /// Paths kept and projected.
        paths_kept: usize,
        /// Vertices across kept paths.
        point_count: usize,
    },
    /// Topology cleanup metrics.
    Clean {
        /// Minimum world length for pruning.
        min_line_length: f64,
        /// Endpoint snapping radius.
        snap_tolerance: f64,
        /// Simplification tolerance.
        simplify_epsilon: f64,
        /// Smoothing rounds.
        smooth_iterations: u32,
        /// Lines entering cleanup.
        lines_before: usize,
        /// Lines after pruning.
        after_prune: usize,
        /// Lines after snapping.
        after_snap: usize,
        /// Lines after simplification.
        after_simplify: usize,
        /// Lines leaving cleanup.
        lines_after: usize,
        /// Vertices entering cleanup.
        points_before: usize,
        /// Vertices leaving cleanup.
        points_after: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Mask width in pixels.
    pub mask_width: u32,
    /// Mask height in pixels.
    pub mask_height: u32,
    /// Graph nodes (pixels of degree other than 2).
    pub node_count: usize,
    /// Skeleton endpoints.
    pub endpoint_count: usize,
    /// Skeleton junctions.
    pub junction_count: usize,
    /// Paths straight out of the tracer.
    pub raw_path_count: usize,
    /// Paths after gap bridging.
    pub bridged_path_count: usize,
    /// Paths kept by the minimum-length filter.
    pub filtered_path_count: usize,
    /// Lines entering topology cleanup.
    pub lines_before_cleanup: usize,
    /// Lines in the final output.
    pub final_line_count: usize,
    /// Vertices in the final output.
    pub final_point_count: usize,
    /// Parameters the run used.
    pub config: PipelineConfig,
}

impl PipelineSummary {
    fn from_result(result: &StagedResult, config: &PipelineConfig) -> Self {
        Self {
            mask_width: result.dimensions.width,
            mask_height: result.dimensions.height,
            node_count: result.node_count,
            endpoint_count: result.endpoints.len(),
            junction_count: result.junctions.len(),
            raw_path_count: result.paths.len(),
            bridged_path_count: result.bridged.len(),
            filtered_path_count: result.projected.len(),
            lines_before_cleanup: result.projected.len(),
            final_line_count: result.lines.len(),
            final_point_count: total_points(&result.lines),
            config: config.clone(),
        }
    }
}

impl PipelineDiagnostics {
    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 6] {
        [
            ("Skeleton", &self.skeleton),
            ("Graph", &self.graph),
            ("Trace", &self.trace),
            ("Bridge", &self.bridge),
            ("Project", &self.project),
            ("Clean", &self.clean),
        ]
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Mask: {}x{}",
            self.summary.mask_width, self.summary.mask_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        let s = &self.summary;
        lines.push(String::new());
        lines.push(format!(
            "Nodes: {} ({} endpoints, {} junctions)",
            s.node_count, s.endpoint_count, s.junction_count,
        ));
        lines.push(format!(
            "Paths: {} raw -> {} bridged -> {} kept",
            s.raw_path_count, s.bridged_path_count, s.filtered_path_count,
        ));
        lines.push(format!(
            "Lines: {} before cleanup -> {} final ({} points)",
            s.lines_before_cleanup, s.final_line_count, s.final_point_count,
        ));

        lines.join("\n")
    }
}

/// Run the full pipeline, timing every stage with `clock`.
///
/// # Errors
///
/// Returns [`PipelineError`] when the mask, bounds, or parameters fail
/// validation.
pub fn process_staged_with_diagnostics<C: Clock>(
    mask: &GrayImage,
    bounds: Bounds,
    config: &PipelineConfig,
    clock: &C,
) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();

    let start = clock.now();
    let skeletonized = Pipeline::new(mask.clone(), bounds, config.clone()).skeletonize()?;
    let skeleton = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: skeletonized.measure(),
    };

    let start = clock.now();
    let graphed = skeletonized.build_graph();
    let graph = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: graphed.measure(),
    };

    let start = clock.now();
    let traced = graphed.trace();
    let trace = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: traced.measure(),
    };

    let start = clock.now();
    let bridged = traced.bridge();
    let bridge = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: bridged.measure(),
    };

    let start = clock.now();
    let projected = bridged.project();
    let project = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: projected.measure(),
    };

    let start = clock.now();
    let cleaned = projected.clean();
    let clean = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: cleaned.measure(),
    };

    let result = cleaned.into_result();
    let total_duration = clock.elapsed(&total_start);
    let summary = PipelineSummary::from_result(&result, config);
    log::debug!(
        "pipeline finished in {:.3}ms with {} lines",
        duration_ms(total_duration),
        summary.final_line_count,
    );

    Ok((
        result,
        PipelineDiagnostics {
            skeleton,
            graph,
            trace,
            bridge,
            project,
            clean,
            total_duration,
            summary,
        },
    ))
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Skeleton {
            shape,
            size,
            spur_prune_length,
            mask_pixel_count,
            skeleton_pixel_count,
            endpoint_count,
            junction_count,
        } => format!(
            "{shape}/{size} spur={spur_prune_length} px={mask_pixel_count}->{skeleton_pixel_count} \
             ends={endpoint_count} junctions={junction_count}",
        ),
        StageMetrics::Graph {
            pixel_count,
            node_count,
            step_count,
        } => format!("{pixel_count} px, {node_count} nodes, {step_count} steps"),
        StageMetrics::Trace {
            path_count,
            component_count,
            branch_point_count,
            total_pixel_count,
            min_path_pixels,
            max_path_pixels,
            mean_path_pixels,
        } => format!(
            "{path_count} paths in {component_count} components ({branch_point_count} branch points), \
             {total_pixel_count} px (min={min_path_pixels} max={max_path_pixels} mean={mean_path_pixels:.1})",
        ),
        StageMetrics::Bridge {
            tolerance,
            paths_before,
            paths_after,
            joins,
        } => format!("tol={tolerance:.2} {paths_before}->{paths_after} paths ({joins} joins)"),
        StageMetrics::Project {
            min_path_length,
            paths_before,
            paths_kept,
            point_count,
        } => format!("min={min_path_length} {paths_before}->{paths_kept} paths, {point_count} pts"),
        StageMetrics::Clean {
            min_line_length,
            snap_tolerance,
            simplify_epsilon,
            smooth_iterations,
            lines_before,
            after_prune,
            after_snap,
            after_simplify,
            lines_after,
            points_before,
            points_after,
        } => format!(
            "prune={min_line_length:.2} snap={snap_tolerance:.2} eps={simplify_epsilon:.2} \
             smooth={smooth_iterations} lines={lines_before}->{after_prune}->{after_snap}->\
             {after_simplify}->{lines_after} pts={points_before}->{points_after}",
        ),
    }
}

/// Statistics over a set of path lengths.
pub(crate) struct PathStats {
    /// Sum of all lengths.
    pub total: usize,
    /// Shortest length.
    pub min: usize,
    /// Longest length.
    pub max: usize,
    /// Mean length.
    pub mean: f64,
}

/// Compute length statistics; all zero for an empty input.
pub(crate) fn path_stats(lengths: impl Iterator<Item = usize>) -> PathStats {
    let mut count = 0_usize;
    let mut total = 0;
    let mut min = usize::MAX;
    let mut max = 0;
    for len in lengths {
        count += 1;
        total += len;
        min = min.min(len);
        max = max.max(len);
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    };
    PathStats {
        total,
        min: if count == 0 { 0 } else { min },
        max,
        mean,
    }
}

/// Total points across a slice of polylines.
pub(crate) fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}
