//! GeoJSON export serializer.
//!
//! Each polyline becomes one `Feature` with `LineString` geometry and
//! empty properties, collected into a single `FeatureCollection`.
//! Coordinates are written as `[x, y]` in whatever world units the
//! pipeline projected into.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use linetrace_pipeline::Polyline;

use crate::ExportError;

/// The `"type": "FeatureCollection"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionTag {
    /// The only valid value.
    #[default]
    FeatureCollection,
}

/// The `"type": "Feature"` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureTag {
    /// The only valid value.
    #[default]
    Feature,
}

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub tag: CollectionTag,
    /// One feature per exported line.
    pub features: Vec<Feature>,
}

/// A GeoJSON `Feature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub tag: FeatureTag,
    /// The line geometry.
    pub geometry: Geometry,
    /// Free-form properties (empty on export).
    pub properties: Map<String, Value>,
}

/// GeoJSON geometry. Only line strings are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    /// An open polyline.
    LineString {
        /// `[x, y]` positions in order.
        coordinates: Vec<[f64; 2]>,
    },
}

/// Build a feature collection with one `LineString` per polyline.
///
/// Polylines with fewer than 2 points are skipped: a `LineString` needs
/// at least two positions.
#[must_use]
pub fn to_feature_collection(lines: &[Polyline]) -> FeatureCollection {
    let features = lines
        .iter()
        .filter(|line| line.len() >= 2)
        .map(|line| Feature {
            tag: FeatureTag::Feature,
            geometry: Geometry::LineString {
                coordinates: line.points().iter().map(|p| p.to_array()).collect(),
            },
            properties: Map::new(),
        })
        .collect();
    FeatureCollection {
        tag: CollectionTag::FeatureCollection,
        features,
    }
}

/// Serialize polylines as a pretty-printed GeoJSON `FeatureCollection`.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if encoding fails.
pub fn to_geojson_string(lines: &[Polyline]) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&to_feature_collection(lines))?)
}
