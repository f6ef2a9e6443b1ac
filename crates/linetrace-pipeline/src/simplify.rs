//! Topology-preserving line simplification (Ramer-Douglas-Peucker).
//!
//! A span of vertices is replaced by its chord only when every interior
//! vertex lies within the tolerance of the chord and the chord does not
//! cross any other segment of the same line. Otherwise the span is split
//! and each half is tried again.

use geo::{Coord, Intersects, Line};

use crate::topology::drop_degenerate;
use crate::types::{Point, Polyline};

/// Simplify a single polyline.
///
/// Points within `epsilon` of the chord between their span's ends are
/// removed unless that chord would cross the rest of the line. An
/// `epsilon` of 0.0 preserves all points. Polylines with fewer than 3
/// points are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, epsilon: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 || epsilon <= 0.0 {
        return polyline.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;

    rdp_recurse(points, 0, points.len() - 1, epsilon, &mut kept);

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polyline::new(simplified)
}

/// Simplify every line independently. `epsilon <= 0` returns the input
/// unchanged.
#[must_use = "returns the simplified lines"]
pub fn simplify_lines(lines: Vec<Polyline>, epsilon: f64) -> Vec<Polyline> {
    if epsilon <= 0.0 {
        return lines;
    }
    let before: usize = lines.iter().map(Polyline::len).sum();
    let simplified: Vec<Polyline> = lines.iter().map(|l| simplify(l, epsilon)).collect();
    let after: usize = simplified.iter().map(Polyline::len).sum();
    log::debug!("simplified {before} -> {after} vertices at epsilon {epsilon}");
    drop_degenerate(simplified)
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` farthest from the chord.
/// If it exceeds `epsilon`, or the chord crosses the line outside the
/// span, a split point is kept and both halves are processed.
fn rdp_recurse(points: &[Point], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist <= epsilon && !chord_crosses_line(points, start, end) {
        return;
    }

    // A blocked chord over collinear points has no farthest point.
    let split = if max_idx == start {
        start + (end - start) / 2
    } else {
        max_idx
    };
    kept[split] = true;
    rdp_recurse(points, start, split, epsilon, kept);
    rdp_recurse(points, split, end, epsilon, kept);
}

fn coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Whether the chord `start..end` intersects a segment of the line that
/// neither lies inside the span nor shares a vertex with the chord.
fn chord_crosses_line(points: &[Point], start: usize, end: usize) -> bool {
    let chord = Line::new(coord(points[start]), coord(points[end]));
    points
        .windows(2)
        .enumerate()
        .filter(|&(k, _)| k + 1 < start || k > end)
        .any(|(_, w)| chord.intersects(&Line::new(coord(w[0]), coord(w[1]))))
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
