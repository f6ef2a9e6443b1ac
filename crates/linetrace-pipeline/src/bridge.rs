//! Gap bridging: join path fragments whose free ends nearly touch.
//!
//! Works in pixel space, before projection. Each path takes part in at
//! most one join.

use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::types::{Point, Polyline};

/// A path terminal in the R*-tree, tagged with its terminal index
/// (`2 * path + 0` for starts, `2 * path + 1` for ends).
type IndexedTerminal = GeomWithData<[f64; 2], usize>;

fn terminal_point(paths: &[Polyline], terminal: usize) -> Option<Point> {
    let path = paths.get(terminal / 2)?;
    if terminal % 2 == 0 {
        path.first().copied()
    } else {
        path.last().copied()
    }
}

/// Join paths whose terminals lie within `tolerance` pixels of each other.
///
/// Terminals are visited in order (path 0 start, path 0 end, path 1 start,
/// ...). Terminal `i` pairs with the lowest-index terminal `j > i` within
/// `tolerance` (inclusive) that belongs to another path not yet joined.
/// The two paths are oriented so the paired terminals meet, concatenated
/// into the first path's slot, and both are retired from further joins.
/// Surviving slots keep their input order. `tolerance <= 0` returns the
/// input unchanged.
#[must_use]
pub fn bridge_gaps(paths: Vec<Polyline>, tolerance: f64) -> Vec<Polyline> {
    if tolerance <= 0.0 || paths.len() < 2 {
        return paths;
    }

    let terminals: Vec<IndexedTerminal> = (0..paths.len() * 2)
        .filter_map(|t| terminal_point(&paths, t).map(|p| GeomWithData::new(p.to_array(), t)))
        .collect();
    let tree = RTree::bulk_load(terminals);
    let max_distance_2 = tolerance * tolerance;

    let mut consumed = vec![false; paths.len()];
    // (terminal i, terminal j) pairs in the order they were decided.
    let mut joins: Vec<(usize, usize)> = Vec::new();

    for i in 0..paths.len() * 2 {
        let path_i = i / 2;
        if consumed[path_i] {
            continue;
        }
        let Some(p) = terminal_point(&paths, i) else {
            continue;
        };
        let partner = tree
            .locate_within_distance(p.to_array(), max_distance_2)
            .map(|candidate| candidate.data)
            .filter(|&j| j > i && j / 2 != path_i && !consumed[j / 2])
            .min();
        if let Some(j) = partner {
            consumed[path_i] = true;
            consumed[j / 2] = true;
            joins.push((i, j));
        }
    }

    let mut slots: Vec<Option<Polyline>> = paths.into_iter().map(Some).collect();
    for &(i, j) in &joins {
        let (Some(a), Some(b)) = (slots[i / 2].take(), slots[j / 2].take()) else {
            continue;
        };
        // Shared terminal at the end of `a` and the start of `b`.
        let a = if i % 2 == 0 { a.reversed() } else { a };
        let b = if j % 2 == 1 { b.reversed() } else { b };
        let mut points = a.into_points();
        points.extend(b.into_points());
        slots[i / 2] = Some(Polyline::new(points));
    }

    let bridged: Vec<Polyline> = slots.into_iter().flatten().collect();
    log::debug!(
        "bridged {} gaps within {tolerance} px, {} paths remain",
        joins.len(),
        bridged.len(),
    );
    bridged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> Polyline {
        Polyline::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn zero_tolerance_is_noop() {
        let paths = vec![line(&[(0.0, 0.0), (1.0, 0.0)]), line(&[(1.0, 0.0), (2.0, 0.0)])];
        assert_eq!(bridge_gaps(paths.clone(), 0.0), paths);
    }

    #[test]
    fn end_to_start_join_keeps_direction() {
        let paths = vec![
            line(&[(0.0, 0.0), (5.0, 0.0)]),
            line(&[(8.0, 0.0), (12.0, 0.0)]),
        ];
        let out = bridge_gaps(paths, 3.0);
        assert_eq!(
            out,
            vec![line(&[(0.0, 0.0), (5.0, 0.0), (8.0, 0.0), (12.0, 0.0)])]
        );
    }

    #[test]
    fn start_to_start_join_reverses_first() {
        let paths = vec![
            line(&[(5.0, 0.0), (0.0, 0.0)]),
            line(&[(7.0, 0.0), (12.0, 0.0)]),
        ];
        let out = bridge_gaps(paths, 2.0);
        assert_eq!(
            out,
            vec![line(&[(0.0, 0.0), (5.0, 0.0), (7.0, 0.0), (12.0, 0.0)])]
        );
    }

    #[test]
    fn end_to_end_join_reverses_second() {
        let paths = vec![
            line(&[(0.0, 0.0), (5.0, 0.0)]),
            line(&[(12.0, 0.0), (6.0, 0.0)]),
        ];
        let out = bridge_gaps(paths, 1.0);
        assert_eq!(
            out,
            vec![line(&[(0.0, 0.0), (5.0, 0.0), (6.0, 0.0), (12.0, 0.0)])]
        );
    }

    #[test]
    fn tolerance_is_inclusive() {
        let paths = vec![
            line(&[(0.0, 0.0), (5.0, 0.0)]),
            line(&[(8.0, 4.0), (9.0, 9.0)]),
        ];
        // Gap is exactly 5.
        assert_eq!(bridge_gaps(paths.clone(), 5.0).len(), 1);
        assert_eq!(bridge_gaps(paths, 4.999).len(), 2);
    }

    #[test]
    fn closed_path_does_not_join_itself() {
        let ring = line(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]);
        assert_eq!(bridge_gaps(vec![ring.clone()], 10.0), vec![ring]);
    }

    #[test]
    fn each_path_joins_at_most_once() {
        // Three collinear fragments with equal gaps: the first two join,
        // the third stays separate.
        let paths = vec![
            line(&[(0.0, 0.0), (4.0, 0.0)]),
            line(&[(5.0, 0.0), (9.0, 0.0)]),
            line(&[(10.0, 0.0), (14.0, 0.0)]),
        ];
        let out = bridge_gaps(paths, 1.5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 4);
        assert_eq!(out[1], line(&[(10.0, 0.0), (14.0, 0.0)]));
    }

    #[test]
    fn lowest_index_partner_wins() {
        let paths = vec![
            line(&[(-5.0, 0.0), (0.0, 0.0)]),
            line(&[(9.0, 9.0), (1.0, 0.0)]),
            line(&[(0.5, 0.0), (0.5, 7.0)]),
        ];
        // Terminal 1 (path 0 end) sees terminal 3 (path 1 end) and 4
        // (path 2 start); 3 wins.
        let out = bridge_gaps(paths, 1.0);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0],
            line(&[(-5.0, 0.0), (0.0, 0.0), (1.0, 0.0), (9.0, 9.0)])
        );
        assert_eq!(out[1], line(&[(0.5, 0.0), (0.5, 7.0)]));
    }
}
