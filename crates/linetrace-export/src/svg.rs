//! SVG export serializer.
//!
//! Converts world-space polylines into an SVG string with `<path>`
//! elements using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting.
//!
//! The `viewBox` spans the world bounds. World y grows upward while SVG
//! y grows downward, so every point is mapped to
//! `(x - min_x, max_y - y)` before it is written.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements for
//! accessibility and to help file managers identify exported files.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use linetrace_pipeline::{Bounds, Point, Polyline};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source mask filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized pipeline configuration, emitted inside a `<metadata>`
    /// element wrapped in a namespaced `<linetrace:pipeline>` element.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a polyline, using its
/// coordinates unchanged.
///
/// Uses `M` for the first point and `L` for subsequent points.
/// Returns an empty string for polylines with fewer than 2 points.
///
/// # Examples
///
/// ```
/// use linetrace_pipeline::{Point, Polyline};
/// use linetrace_export::build_path_data;
///
/// let polyline = Polyline::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
/// ]);
/// let d = build_path_data(&polyline);
/// assert_eq!(d, "M10,20 L30,40");
/// ```
#[must_use]
pub fn build_path_data(polyline: &Polyline) -> String {
    build_path_data_mapped(polyline, |p| (p.x, p.y))
}

/// Like [`build_path_data`] but passes every point through `map` first.
fn build_path_data_mapped(polyline: &Polyline, map: impl Fn(&Point) -> (f64, f64)) -> String {
    let points = polyline.points();
    if points.len() < 2 {
        return String::new();
    }

    let mut data = Data::new().move_to(map(&points[0]));
    for p in &points[1..] {
        data = data.line_to(map(p));
    }
    String::from(Value::from(data))
}

/// Serialize world-space polylines into an SVG document string.
///
/// Each [`Polyline`] with 2 or more points becomes a `<path>` element;
/// shorter ones are skipped. The `viewBox` is `0 0 width height` where
/// width and height are the extents of `bounds`, and the y axis is
/// flipped so north stays up. Strokes use `non-scaling-stroke` so they
/// stay one unit wide whatever the world scale.
///
/// # Examples
///
/// ```
/// use linetrace_pipeline::{Bounds, Point, Polyline};
/// use linetrace_export::{SvgMetadata, to_svg};
///
/// let lines = vec![
///     Polyline::new(vec![Point::new(10.0, 15.0), Point::new(12.5, 18.5)]),
/// ];
/// let bounds = Bounds::new(0.0, 0.0, 100.0, 50.0);
/// let metadata = SvgMetadata {
///     title: Some("roads"),
///     ..SvgMetadata::default()
/// };
/// let svg = to_svg(&lines, &bounds, &metadata);
/// assert!(svg.contains("<title>roads</title>"));
/// assert!(svg.contains("M10,35 L12.5,31.5"));
/// ```
#[must_use]
pub fn to_svg(lines: &[Polyline], bounds: &Bounds, metadata: &SvgMetadata<'_>) -> String {
    let width = bounds.max_x - bounds.min_x;
    let height = bounds.max_y - bounds.min_y;

    let mut doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("linetrace:pipeline");
        pipeline_el.assign("xmlns:linetrace", "urn:linetrace:pipeline:1");
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    let to_view = |p: &Point| (p.x - bounds.min_x, bounds.max_y - p.y);
    for line in lines {
        let d = build_path_data_mapped(line, to_view);
        if d.is_empty() {
            continue;
        }

        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1)
            .set("vector-effect", "non-scaling-stroke");
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
