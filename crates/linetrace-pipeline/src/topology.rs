//! World-space topology cleanup: short-line pruning, endpoint snapping, and
//! Chaikin smoothing.
//!
//! Simplification lives in [`crate::simplify`]. Every step here is a pure
//! `Vec<Polyline> -> Vec<Polyline>` transform that drops the degenerate
//! lines it produces.

use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::types::{Point, Polyline};

/// Drop lines with fewer than two vertices or zero length.
#[must_use]
pub fn drop_degenerate(lines: Vec<Polyline>) -> Vec<Polyline> {
    let before = lines.len();
    let kept: Vec<Polyline> = lines.into_iter().filter(|l| !l.is_degenerate()).collect();
    if kept.len() < before {
        log::debug!("dropped {} degenerate lines", before - kept.len());
    }
    kept
}

/// Keep lines whose length is at least `min_length`. `min_length <= 0`
/// keeps everything.
#[must_use]
pub fn prune_short_lines(lines: Vec<Polyline>, min_length: f64) -> Vec<Polyline> {
    if min_length <= 0.0 {
        return lines;
    }
    lines
        .into_iter()
        .filter(|l| l.length() >= min_length)
        .collect()
}

struct Cluster {
    sum_x: f64,
    sum_y: f64,
    count: u32,
}

impl Cluster {
    fn centroid(&self) -> Point {
        let n = f64::from(self.count);
        Point::new(self.sum_x / n, self.sum_y / n)
    }
}

/// Cluster line ends and move every end to its cluster's centroid.
///
/// Ends are visited in order (line 0 start, line 0 end, line 1 start, ...).
/// Each joins the earliest-created cluster whose first member lies within
/// `tolerance`, or starts a new cluster. The greedy first match depends
/// on input order. `tolerance <= 0` returns the input unchanged.
#[must_use]
pub fn snap_endpoints(lines: Vec<Polyline>, tolerance: f64) -> Vec<Polyline> {
    if tolerance <= 0.0 {
        return lines;
    }
    let max_distance_2 = tolerance * tolerance;

    let mut clusters: Vec<Cluster> = Vec::new();
    let mut representatives: RTree<GeomWithData<[f64; 2], usize>> = RTree::new();
    let mut assignment: Vec<Option<usize>> = Vec::with_capacity(lines.len() * 2);

    for line in &lines {
        for end in [line.first(), line.last()] {
            let Some(&p) = end else {
                assignment.push(None);
                continue;
            };
            let existing = representatives
                .locate_within_distance(p.to_array(), max_distance_2)
                .map(|r| r.data)
                .min();
            let id = existing.unwrap_or_else(|| {
                clusters.push(Cluster {
                    sum_x: 0.0,
                    sum_y: 0.0,
                    count: 0,
                });
                let id = clusters.len() - 1;
                representatives.insert(GeomWithData::new(p.to_array(), id));
                id
            });
            let cluster = &mut clusters[id];
            cluster.sum_x += p.x;
            cluster.sum_y += p.y;
            cluster.count += 1;
            assignment.push(Some(id));
        }
    }
    log::debug!(
        "snapped {} line ends into {} clusters",
        assignment.len(),
        clusters.len(),
    );

    let snapped = lines
        .into_iter()
        .zip(assignment.chunks(2))
        .map(|(line, ends)| {
            let mut points = line.into_points();
            if let (Some(Some(start)), Some(first)) = (ends.first(), points.first_mut()) {
                *first = clusters[*start].centroid();
            }
            if let (Some(Some(end)), Some(last)) = (ends.get(1), points.last_mut()) {
                *last = clusters[*end].centroid();
            }
            Polyline::new(points)
        })
        .collect();
    drop_degenerate(snapped)
}

/// One round of Chaikin corner cutting, keeping both end vertices.
fn chaikin(points: &[Point]) -> Vec<Point> {
    let Some((&first, &last)) = points.first().zip(points.last()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(points.len() * 2);
    out.push(first);
    for w in points.windows(2) {
        out.push(w[0].lerp(w[1], 0.25));
        out.push(w[0].lerp(w[1], 0.75));
    }
    if let Some(tail) = out.last_mut() {
        *tail = last;
    }
    out
}

/// Smooth one line with up to `iterations` rounds of corner cutting.
/// Lines with fewer than three vertices have no corners and stop early.
#[must_use]
pub fn smooth_line(line: Polyline, iterations: u32) -> Polyline {
    let mut points = line.into_points();
    for _ in 0..iterations {
        if points.len() < 3 {
            break;
        }
        points = chaikin(&points);
    }
    Polyline::new(points)
}

/// Smooth every line. `iterations == 0` returns the input unchanged.
#[must_use]
pub fn smooth_lines(lines: Vec<Polyline>, iterations: u32) -> Vec<Polyline> {
    if iterations == 0 {
        return lines;
    }
    drop_degenerate(
        lines
            .into_iter()
            .map(|l| smooth_line(l, iterations))
            .collect(),
    )
}
