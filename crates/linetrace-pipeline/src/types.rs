//! Shared types for the linetrace pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can hand masks to the
/// pipeline without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point. Pixel space (x right, y down) before projection, world
/// space (y up) after.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation towards `other`: `t = 0` is `self`, `t = 1`
    /// is `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            t.mul_add(other.x - self.x, self.x),
            t.mul_add(other.y - self.y, self.y),
        )
    }

    /// Coordinates as an array, the point type used by the R*-tree indexes.
    #[must_use]
    pub const fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<PixelCoord> for Point {
    fn from(p: PixelCoord) -> Self {
        Self::new(f64::from(p.x), f64::from(p.y))
    }
}

/// An ordered sequence of connected points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Build a pixel-space polyline from a traced pixel path.
    #[must_use]
    pub fn from_pixels(pixels: &[PixelCoord]) -> Self {
        Self(pixels.iter().copied().map(Point::from).collect())
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Sum of segment lengths.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// The same points in reverse order.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.0.reverse();
        self
    }

    /// A line with fewer than two points, or with zero length, carries no
    /// geometry and is dropped by the cleanup stages.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.0.len() < 2 || self.length() == 0.0
    }
}

/// Integer pixel coordinate in raster space.
///
/// Ordering is the lexicographic `(x, y)` tuple order. Edge keys and
/// every ordered map keyed by pixels rely on it, so it must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PixelCoord {
    /// Column.
    pub x: u32,
    /// Row, counted from the top.
    pub y: u32,
}

impl PixelCoord {
    /// Create a new pixel coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of a mask.
    #[must_use]
    pub fn of(image: &GrayImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// World-coordinate bounding box of the mask.
///
/// Pixel column 0 maps to `min_x`, the last column to `max_x`. Rows are
/// flipped: row 0 maps to `max_y`, the last row to `min_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl Bounds {
    /// Create a new bounding box.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check that all edges are finite and `min < max` on both axes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] naming the failed check.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let edges = [self.min_x, self.min_y, self.max_x, self.max_y];
        if edges.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::invalid_input(
                StageId::Validate,
                format!("bounding box has a non-finite edge: {self:?}"),
            ));
        }
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return Err(PipelineError::invalid_input(
                StageId::Validate,
                format!(
                    "bounding box must satisfy min < max on both axes, got \
                     x: {}..{}, y: {}..{}",
                    self.min_x, self.max_x, self.min_y, self.max_y,
                ),
            ));
        }
        Ok(())
    }

    /// Project a pixel-space point into world coordinates.
    ///
    /// `dimensions` must be at least 2x2; [`PipelineConfig::validate_mask`]
    /// rejects anything smaller before projection runs.
    #[must_use]
    pub fn to_world(&self, point: Point, dimensions: Dimensions) -> Point {
        let x_ratio = point.x / f64::from(dimensions.width.saturating_sub(1).max(1));
        let y_ratio = point.y / f64::from(dimensions.height.saturating_sub(1).max(1));
        Point::new(
            x_ratio.mul_add(self.max_x - self.min_x, self.min_x),
            (-y_ratio).mul_add(self.max_y - self.min_y, self.max_y),
        )
    }

    /// World width divided by pixel steps: the size of one pixel along x.
    #[must_use]
    pub fn pixel_size(&self, dimensions: Dimensions) -> (f64, f64) {
        (
            (self.max_x - self.min_x) / f64::from(dimensions.width.saturating_sub(1).max(1)),
            (self.max_y - self.min_y) / f64::from(dimensions.height.saturating_sub(1).max(1)),
        )
    }
}

/// Neighborhood shape of the structuring element used by thinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    /// Plus-shaped element (L1 ball). Keeps the skeleton 8-connected and thin.
    #[default]
    Cross,
    /// Full square element (L-infinity ball).
    Square,
}

impl fmt::Display for KernelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cross => f.write_str("cross"),
            Self::Square => f.write_str("square"),
        }
    }
}

impl FromStr for KernelShape {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cross" => Ok(Self::Cross),
            "square" | "rect" => Ok(Self::Square),
            other => Err(PipelineError::invalid_input(
                StageId::Validate,
                format!("unsupported structuring element shape: {other:?}"),
            )),
        }
    }
}

/// Structuring element for morphological thinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringElement {
    /// Neighborhood shape.
    pub shape: KernelShape,
    /// Side length in pixels. Must be odd and at least 3.
    pub size: u32,
}

impl StructuringElement {
    /// Largest side length accepted (radius fits the `u8` that
    /// `imageproc::morphology` takes).
    pub const MAX_SIZE: u32 = 511;

    /// Morphology radius: the distance from the center to the edge.
    #[must_use]
    pub fn radius(&self) -> u8 {
        u8::try_from(self.size / 2).unwrap_or(u8::MAX)
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self {
            shape: KernelShape::Cross,
            size: 3,
        }
    }
}

/// Identifies a pipeline stage in errors and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Entry validation of mask, bounds, and parameters.
    Validate,
    /// Skeleton extraction and spur pruning.
    Skeleton,
    /// Graph construction.
    Graph,
    /// Path tracing.
    Trace,
    /// Gap bridging.
    Bridge,
    /// Minimum-length filter and projection into world coordinates.
    Project,
    /// Short-line pruning.
    Prune,
    /// Endpoint clustering and snapping.
    Snap,
    /// Topology-preserving simplification.
    Simplify,
    /// Chaikin smoothing.
    Smooth,
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Skeleton => "skeleton",
            Self::Graph => "graph",
            Self::Trace => "trace",
            Self::Bridge => "bridge",
            Self::Project => "project",
            Self::Prune => "prune",
            Self::Snap => "snap",
            Self::Simplify => "simplify",
            Self::Smooth => "smooth",
        };
        f.write_str(name)
    }
}

/// Configuration for the line pipeline.
///
/// Pixel-space parameters (`spur_prune_length`, `min_path_length`,
/// `gap_bridge_tolerance`) apply before projection; the remaining
/// tolerances are in world units. Call [`validate`](Self::validate) (the
/// pipeline does so at entry) to enforce the documented ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Structuring element used by thinning.
    pub structuring_element: StructuringElement,

    /// Maximum length, in pixels, of a dead-end branch removed after
    /// thinning. `0` disables spur pruning.
    pub spur_prune_length: usize,

    /// Minimum number of pixels a traced (and bridged) path needs to be
    /// kept.
    pub min_path_length: usize,

    /// Maximum distance, in pixels, between two free path ends that are
    /// joined. `0.0` disables bridging.
    pub gap_bridge_tolerance: f64,

    /// Minimum geometric length, in world units, of a line kept by
    /// short-line pruning. `0.0` disables pruning.
    pub min_line_length: f64,

    /// Distance, in world units, within which line ends are clustered and
    /// snapped to a shared coordinate. `0.0` disables snapping.
    pub snap_tolerance: f64,

    /// Douglas-Peucker tolerance in world units. `0.0` disables
    /// simplification.
    pub simplify_epsilon: f64,

    /// Chaikin corner-cutting iterations. `0` disables smoothing.
    pub smooth_iterations: u32,
}

impl PipelineConfig {
    /// Default structuring element side length.
    pub const DEFAULT_KERNEL_SIZE: u32 = 3;
    /// Default spur pruning length (disabled).
    pub const DEFAULT_SPUR_PRUNE_LENGTH: usize = 0;
    /// Default minimum traced path length in pixels.
    pub const DEFAULT_MIN_PATH_LENGTH: usize = 10;
    /// Default gap bridging tolerance (disabled).
    pub const DEFAULT_GAP_BRIDGE_TOLERANCE: f64 = 0.0;
    /// Default minimum line length (disabled).
    pub const DEFAULT_MIN_LINE_LENGTH: f64 = 0.0;
    /// Default snap tolerance (disabled).
    pub const DEFAULT_SNAP_TOLERANCE: f64 = 0.0;
    /// Default simplification epsilon (disabled).
    pub const DEFAULT_SIMPLIFY_EPSILON: f64 = 0.0;
    /// Default smoothing iterations (disabled).
    pub const DEFAULT_SMOOTH_ITERATIONS: u32 = 0;
    /// Each smoothing iteration doubles the vertex count; past this the
    /// output grows without visible change.
    pub const MAX_SMOOTH_ITERATIONS: u32 = 8;

    /// Check every parameter against its documented range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParameterOutOfRange`] for the first
    /// parameter that violates its range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let element = self.structuring_element;
        if element.size < 3 || element.size % 2 == 0 || element.size > StructuringElement::MAX_SIZE
        {
            return Err(PipelineError::out_of_range(
                StageId::Skeleton,
                "structuring_element.size",
                format!(
                    "must be odd and within 3..={}, got {}",
                    StructuringElement::MAX_SIZE,
                    element.size,
                ),
            ));
        }
        if self.min_path_length == 0 {
            return Err(PipelineError::out_of_range(
                StageId::Project,
                "min_path_length",
                "must be at least 1".to_owned(),
            ));
        }
        for (stage, name, value) in [
            (
                StageId::Bridge,
                "gap_bridge_tolerance",
                self.gap_bridge_tolerance,
            ),
            (StageId::Prune, "min_line_length", self.min_line_length),
            (StageId::Snap, "snap_tolerance", self.snap_tolerance),
            (StageId::Simplify, "simplify_epsilon", self.simplify_epsilon),
        ] {
            check_non_negative(stage, name, value)?;
        }
        if self.smooth_iterations > Self::MAX_SMOOTH_ITERATIONS {
            return Err(PipelineError::out_of_range(
                StageId::Smooth,
                "smooth_iterations",
                format!(
                    "must be at most {}, got {}",
                    Self::MAX_SMOOTH_ITERATIONS,
                    self.smooth_iterations,
                ),
            ));
        }
        Ok(())
    }

    /// Check that a mask is large enough to be projected.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] when either side is shorter
    /// than 2 pixels.
    pub fn validate_mask(mask: &GrayImage) -> Result<(), PipelineError> {
        if mask.width() <= 1 || mask.height() <= 1 {
            return Err(PipelineError::invalid_input(
                StageId::Validate,
                format!(
                    "mask must be at least 2x2 pixels, got {}x{}",
                    mask.width(),
                    mask.height(),
                ),
            ));
        }
        Ok(())
    }
}

fn check_non_negative(stage: StageId, name: &'static str, value: f64) -> Result<(), PipelineError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PipelineError::out_of_range(
            stage,
            name,
            format!("must be finite and non-negative, got {value}"),
        ));
    }
    Ok(())
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            structuring_element: StructuringElement {
                shape: KernelShape::Cross,
                size: Self::DEFAULT_KERNEL_SIZE,
            },
            spur_prune_length: Self::DEFAULT_SPUR_PRUNE_LENGTH,
            min_path_length: Self::DEFAULT_MIN_PATH_LENGTH,
            gap_bridge_tolerance: Self::DEFAULT_GAP_BRIDGE_TOLERANCE,
            min_line_length: Self::DEFAULT_MIN_LINE_LENGTH,
            snap_tolerance: Self::DEFAULT_SNAP_TOLERANCE,
            simplify_epsilon: Self::DEFAULT_SIMPLIFY_EPSILON,
            smooth_iterations: Self::DEFAULT_SMOOTH_ITERATIONS,
        }
    }
}

/// Result of running the full pipeline.
///
/// An empty `lines` vector is a valid outcome (the mask had nothing
/// traceable), distinct from an `Err`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    /// Cleaned vector lines in world coordinates.
    pub lines: Vec<Polyline>,

    /// Dimensions of the source mask in pixels.
    pub dimensions: Dimensions,

    /// World bounds the lines were projected into.
    pub bounds: Bounds,
}

/// Result of running the pipeline with every intermediate preserved.
///
/// Does not derive `PartialEq` because `GrayImage` does not implement it.
#[derive(Debug, Clone)]
pub struct StagedResult {
    /// Skeleton after thinning and spur pruning (0/255).
    pub skeleton: GrayImage,
    /// Skeleton pixels with exactly one set neighbor.
    pub endpoints: Vec<PixelCoord>,
    /// Skeleton pixels with three or more set neighbors.
    pub junctions: Vec<PixelCoord>,
    /// Number of graph nodes (every pixel whose degree is not 2).
    pub node_count: usize,
    /// Traced pixel paths.
    pub paths: Vec<Vec<PixelCoord>>,
    /// Paths after gap bridging (pixel space).
    pub bridged: Vec<Polyline>,
    /// Paths kept by the minimum-length filter, in world coordinates.
    pub projected: Vec<Polyline>,
    /// Lines after short-line pruning.
    pub pruned: Vec<Polyline>,
    /// Lines after endpoint snapping.
    pub snapped: Vec<Polyline>,
    /// Lines after simplification.
    pub simplified: Vec<Polyline>,
    /// Final lines after smoothing.
    pub lines: Vec<Polyline>,
    /// Source mask dimensions.
    pub dimensions: Dimensions,
    /// World bounds used for projection.
    pub bounds: Bounds,
}

impl StagedResult {
    /// Drop the intermediates, keeping the final lines.
    #[must_use]
    pub fn into_process_result(self) -> ProcessResult {
        ProcessResult {
            lines: self.lines,
            dimensions: self.dimensions,
            bounds: self.bounds,
        }
    }
}

/// Errors that abort a pipeline run.
///
/// Every variant names the stage whose invariant was violated. Empty
/// masks and empty outputs are not errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PipelineError {
    /// Malformed mask, bounds, or structuring-element description.
    #[error("invalid input ({stage}): {reason}")]
    InvalidInput {
        /// Stage whose precondition failed.
        stage: StageId,
        /// Which invariant was violated.
        reason: String,
    },

    /// A parameter lies outside its documented range.
    #[error("parameter `{parameter}` out of range ({stage}): {reason}")]
    ParameterOutOfRange {
        /// Stage that consumes the parameter.
        stage: StageId,
        /// Parameter name as it appears in [`PipelineConfig`].
        parameter: String,
        /// Which range was violated.
        reason: String,
    },
}

impl PipelineError {
    pub(crate) const fn invalid_input(stage: StageId, reason: String) -> Self {
        Self::InvalidInput { stage, reason }
    }

    pub(crate) fn out_of_range(stage: StageId, parameter: &str, reason: String) -> Self {
        Self::ParameterOutOfRange {
            stage,
            parameter: parameter.to_owned(),
            reason,
        }
    }

    /// The stage whose invariant failed.
    #[must_use]
    pub const fn stage(&self) -> StageId {
        match self {
            Self::InvalidInput { stage, .. } | Self::ParameterOutOfRange { stage, .. } => *stage,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_lerp_quarters() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 8.0);
        assert_eq!(a.lerp(b, 0.25), Point::new(1.0, 2.0));
        assert_eq!(a.lerp(b, 0.75), Point::new(3.0, 6.0));
    }

    #[test]
    fn point_from_pixel() {
        assert_eq!(Point::from(PixelCoord::new(3, 7)), Point::new(3.0, 7.0));
    }

    // --- Polyline tests ---

    #[test]
    fn polyline_empty() {
        let pl = Polyline::new(vec![]);
        assert!(pl.is_empty());
        assert!(pl.first().is_none());
        assert!(pl.last().is_none());
        assert!(pl.is_degenerate());
    }

    #[test]
    fn polyline_length_sums_segments() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 10.0),
        ]);
        assert!((pl.length() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn polyline_reversed() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 2.0)]);
        let rev = pl.reversed();
        assert_eq!(rev.first(), Some(&Point::new(1.0, 2.0)));
        assert_eq!(rev.last(), Some(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn polyline_zero_length_is_degenerate() {
        let pl = Polyline::new(vec![Point::new(1.0, 1.0), Point::new(1.0, 1.0)]);
        assert!(pl.is_degenerate());
    }

    // --- PixelCoord tests ---

    #[test]
    fn pixel_coord_orders_by_x_then_y() {
        assert!(PixelCoord::new(1, 9) < PixelCoord::new(2, 0));
        assert!(PixelCoord::new(2, 0) < PixelCoord::new(2, 1));
    }

    // --- Bounds tests ---

    #[test]
    fn bounds_maps_corners_with_vertical_flip() {
        let bounds = Bounds::new(10.0, 40.0, 20.0, 50.0);
        let dims = Dimensions {
            width: 11,
            height: 21,
        };
        assert_eq!(
            bounds.to_world(Point::new(0.0, 0.0), dims),
            Point::new(10.0, 50.0)
        );
        assert_eq!(
            bounds.to_world(Point::new(10.0, 20.0), dims),
            Point::new(20.0, 40.0)
        );
        let mid = bounds.to_world(Point::new(5.0, 10.0), dims);
        assert!((mid.x - 15.0).abs() < 1e-12);
        assert!((mid.y - 45.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_rejects_inverted_axis() {
        let err = Bounds::new(0.0, 5.0, 1.0, 5.0).validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidInput {
                stage: StageId::Validate,
                ..
            }
        ));
    }

    #[test]
    fn bounds_rejects_non_finite() {
        assert!(Bounds::new(0.0, 0.0, f64::NAN, 1.0).validate().is_err());
        assert!(
            Bounds::new(f64::NEG_INFINITY, 0.0, 1.0, 1.0)
                .validate()
                .is_err()
        );
    }

    // --- KernelShape tests ---

    #[test]
    fn kernel_shape_parses_known_names() {
        assert_eq!("cross".parse::<KernelShape>().unwrap(), KernelShape::Cross);
        assert_eq!("Rect".parse::<KernelShape>().unwrap(), KernelShape::Square);
    }

    #[test]
    fn kernel_shape_rejects_unknown_names() {
        let err = "ellipse".parse::<KernelShape>().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
        assert!(err.to_string().contains("ellipse"));
    }

    // --- PipelineConfig tests ---

    #[test]
    fn pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.structuring_element, StructuringElement::default());
        assert_eq!(config.spur_prune_length, 0);
        assert_eq!(config.min_path_length, 10);
        assert!(config.gap_bridge_tolerance.abs() < f64::EPSILON);
        assert_eq!(config.smooth_iterations, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_even_kernel() {
        let config = PipelineConfig {
            structuring_element: StructuringElement {
                shape: KernelShape::Cross,
                size: 4,
            },
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::ParameterOutOfRange { ref parameter, .. } if parameter == "structuring_element.size")
        );
    }

    #[test]
    fn validate_rejects_zero_kernel() {
        let config = PipelineConfig {
            structuring_element: StructuringElement {
                shape: KernelShape::Square,
                size: 0,
            },
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_tolerance() {
        let config = PipelineConfig {
            snap_tolerance: -0.5,
            ..PipelineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.stage(), StageId::Snap);
        assert!(err.to_string().contains("snap_tolerance"));
    }

    #[test]
    fn validate_rejects_nan_epsilon() {
        let config = PipelineConfig {
            simplify_epsilon: f64::NAN,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_min_path_length() {
        let config = PipelineConfig {
            min_path_length: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_smoothing() {
        let config = PipelineConfig {
            smooth_iterations: PipelineConfig::MAX_SMOOTH_ITERATIONS + 1,
            ..PipelineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().stage(), StageId::Smooth);
    }

    #[test]
    fn validate_mask_rejects_single_row() {
        let mask = GrayImage::new(10, 1);
        assert!(PipelineConfig::validate_mask(&mask).is_err());
        assert!(PipelineConfig::validate_mask(&GrayImage::new(2, 2)).is_ok());
    }

    // --- Serde tests ---

    #[test]
    fn pipeline_config_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"snap_tolerance": 2.5, "smooth_iterations": 2}"#).unwrap();
        assert!((config.snap_tolerance - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.smooth_iterations, 2);
        assert_eq!(config.min_path_length, PipelineConfig::DEFAULT_MIN_PATH_LENGTH);
    }

    #[test]
    fn pipeline_config_rejects_unknown_shape_name() {
        let result: Result<PipelineConfig, _> = serde_json::from_str(
            r#"{"structuring_element": {"shape": "ellipse", "size": 3}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::out_of_range(
            StageId::Bridge,
            "gap_bridge_tolerance",
            "must be finite and non-negative, got -1".to_owned(),
        );
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn error_display_names_stage() {
        let err = PipelineError::invalid_input(StageId::Validate, "too small".to_owned());
        assert_eq!(err.to_string(), "invalid input (validate): too small");
    }
}
