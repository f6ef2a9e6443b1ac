//! linetrace-pipeline: raster mask to vector lines (sans-IO).
//!
//! Converts a binary mask into cleaned world-space polylines through:
//! thinning -> spur pruning -> pixel graph -> path tracing ->
//! gap bridging -> length filter + projection -> prune -> snap ->
//! simplify -> smooth.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! [`GrayImage`] masks and returns structured data. Decoding files and
//! writing GeoJSON or SVG live in `linetrace-export` and the `linetrace`
//! binary.

pub mod bridge;
pub mod diagnostics;
pub mod graph;
pub mod pipeline;
pub mod project;
pub mod raster;
pub mod simplify;
pub mod skeleton;
pub mod topology;
pub mod trace;
pub mod types;

pub use pipeline::Pipeline;
pub use skeleton::Skeleton;
pub use types::{
    Bounds, Dimensions, GrayImage, KernelShape, PipelineConfig, PipelineError, PixelCoord, Point,
    Polyline, ProcessResult, StageId, StagedResult, StructuringElement,
};

/// Run the full pipeline and return only the final lines.
///
/// Every set pixel (non-zero value) of `mask` is foreground. Lines are
/// projected so pixel `(0, 0)` maps to `(bounds.min_x, bounds.max_y)` and
/// pixel `(width - 1, height - 1)` maps to `(bounds.max_x, bounds.min_y)`.
/// An empty mask yields `Ok` with no lines.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] for a mask smaller than 2x2 or
/// malformed bounds, and [`PipelineError::ParameterOutOfRange`] for a
/// parameter outside its documented range.
pub fn process(
    mask: &GrayImage,
    bounds: Bounds,
    config: &PipelineConfig,
) -> Result<ProcessResult, PipelineError> {
    Ok(process_staged(mask, bounds, config)?.into_process_result())
}

/// Run the full pipeline, preserving every intermediate result.
///
/// Equivalent to driving [`Pipeline`] through every stage and calling
/// [`into_result`](pipeline::Cleaned::into_result); see
/// [`Pending::complete`](pipeline::Pending::complete).
///
/// # Errors
///
/// Same as [`process`].
pub fn process_staged(
    mask: &GrayImage,
    bounds: Bounds,
    config: &PipelineConfig,
) -> Result<StagedResult, PipelineError> {
    Pipeline::new(mask.clone(), bounds, config.clone()).complete()
}
