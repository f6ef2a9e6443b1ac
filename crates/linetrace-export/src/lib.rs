//! linetrace-export: Pure format serializers (sans-IO)
//!
//! Converts world-space polylines into GeoJSON and SVG strings. No file
//! or network access happens here; callers write the returned text.

pub mod geojson;
pub mod svg;

pub use geojson::{Feature, FeatureCollection, Geometry, to_feature_collection, to_geojson_string};
pub use svg::{SvgMetadata, build_path_data, to_svg};

/// Errors raised while serializing output.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// JSON encoding or decoding failed.
    #[error("GeoJSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
