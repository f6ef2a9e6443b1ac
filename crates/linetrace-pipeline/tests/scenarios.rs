//! End-to-end scenarios and pipeline-wide properties.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use image::Luma;
use linetrace_pipeline::graph::{EdgeKey, build_graph};
use linetrace_pipeline::skeleton::{classify, skeletonize};
use linetrace_pipeline::trace::trace_paths;
use linetrace_pipeline::{
    Bounds, GrayImage, PipelineConfig, PixelCoord, Point, Polyline, StructuringElement, bridge,
    process, process_staged, raster, topology,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mask_from(width: u32, height: u32, pixels: &[(u32, u32)]) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for &(x, y) in pixels {
        img.put_pixel(x, y, Luma([255]));
    }
    img
}

/// Width-3 band along the main diagonal from `(from, from)` to `(to, to)`.
fn diagonal_band(size: u32, from: u32, to: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        let inside = (from..=to).contains(&x) && (from..=to).contains(&y) && x.abs_diff(y) <= 1;
        Luma([if inside { 255 } else { 0 }])
    })
}

/// One-pixel "Y": two diagonal arms meeting at (20, 20) above a vertical
/// stem.
fn y_mask() -> GrayImage {
    let mut pixels = vec![(20, 20)];
    for k in 1..=15 {
        pixels.push((20 - k, 20 - k));
        pixels.push((20 + k, 20 - k));
        pixels.push((20, 20 + k));
    }
    mask_from(41, 41, &pixels)
}

/// Two horizontal one-pixel segments on row 10, `x0..=x1` each.
fn two_segments(first: (u32, u32), second: (u32, u32)) -> GrayImage {
    let pixels: Vec<(u32, u32)> = (first.0..=first.1)
        .chain(second.0..=second.1)
        .map(|x| (x, 10))
        .collect();
    mask_from(50, 21, &pixels)
}

fn pc(x: u32, y: u32) -> PixelCoord {
    PixelCoord { x, y }
}

#[test]
fn diagonal_band_traces_to_one_line_with_accurate_ends() {
    init_logging();
    // Ten world units per pixel, so a pixel-equivalent is 10.0.
    let bounds = Bounds::new(0.0, 0.0, 590.0, 590.0);
    let result = process(
        &diagonal_band(60, 5, 54),
        bounds,
        &PipelineConfig::default(),
    )
    .unwrap();
    assert_eq!(result.lines.len(), 1);

    let line = &result.lines[0];
    let true_ends = [Point::new(50.0, 540.0), Point::new(540.0, 50.0)];
    let ends = [*line.first().unwrap(), *line.last().unwrap()];
    for end in ends {
        let nearest = true_ends
            .iter()
            .map(|t| t.distance(end))
            .fold(f64::INFINITY, f64::min);
        assert!(nearest <= 10.0, "end {end:?} is {nearest} from the true end");
    }
    assert!(ends[0].distance(ends[1]) > 600.0);
}

#[test]
fn y_mask_has_one_junction_and_three_paths() {
    init_logging();
    let staged = process_staged(
        &y_mask(),
        Bounds::new(0.0, 0.0, 40.0, 40.0),
        &PipelineConfig::default(),
    )
    .unwrap();
    assert_eq!(staged.junctions, vec![pc(20, 20)]);
    assert_eq!(staged.endpoints.len(), 3);
    assert_eq!(staged.paths.len(), 3);
    for path in &staged.paths {
        let ends = [path[0], path[path.len() - 1]];
        assert!(ends.contains(&pc(20, 20)), "path {path:?} misses the junction");
        assert!(
            ends.iter().any(|e| staged.endpoints.contains(e)),
            "path {path:?} misses an endpoint",
        );
    }
    assert_eq!(staged.lines.len(), 3);
}

#[test]
fn gap_of_five_bridges_at_six_but_not_at_four() {
    init_logging();
    let mask = two_segments((5, 20), (25, 40));
    let bounds = Bounds::new(0.0, 0.0, 49.0, 20.0);

    let merged = process(
        &mask,
        bounds,
        &PipelineConfig {
            gap_bridge_tolerance: 6.0,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    assert_eq!(merged.lines.len(), 1);
    assert_eq!(merged.lines[0].len(), 32);

    let separate = process(
        &mask,
        bounds,
        &PipelineConfig {
            gap_bridge_tolerance: 4.0,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    assert_eq!(separate.lines.len(), 2);
}

#[test]
fn short_stub_is_pruned_from_straight_line() {
    init_logging();
    let mut pixels: Vec<(u32, u32)> = (5..=44).map(|x| (x, 10)).collect();
    pixels.extend([(25, 11), (25, 12), (25, 13)]);
    let mask = mask_from(50, 20, &pixels);

    let config = PipelineConfig {
        spur_prune_length: 5,
        ..PipelineConfig::default()
    };
    let staged = process_staged(&mask, Bounds::new(0.0, 0.0, 49.0, 19.0), &config).unwrap();
    assert!(staged.junctions.is_empty());
    assert_eq!(staged.endpoints, vec![pc(5, 10), pc(44, 10)]);
    assert_eq!(staged.lines.len(), 1);

    // Without pruning the stub survives as a branch.
    let unpruned = process_staged(
        &mask,
        Bounds::new(0.0, 0.0, 49.0, 19.0),
        &PipelineConfig::default(),
    )
    .unwrap();
    assert!(!unpruned.junctions.is_empty());
}

/// Width-3 horizontal stroke over rows 9..=11, `x0..=x1`.
fn thick_stroke(x0: u32, x1: u32) -> impl Fn(u32, u32) -> bool {
    move |x, y| (x0..=x1).contains(&x) && (9..=11).contains(&y)
}

#[test]
fn thick_stub_is_pruned_after_thinning() {
    init_logging();
    let bar = thick_stroke(5, 44);
    let mask = GrayImage::from_fn(50, 20, |x, y| {
        let stub = (24..=26).contains(&x) && (12..=14).contains(&y);
        Luma([if bar(x, y) || stub { 255 } else { 0 }])
    });
    let config = PipelineConfig {
        spur_prune_length: 5,
        ..PipelineConfig::default()
    };
    let staged = process_staged(&mask, Bounds::new(0.0, 0.0, 49.0, 19.0), &config).unwrap();
    assert!(staged.junctions.is_empty());
    assert_eq!(staged.endpoints.len(), 2);
    assert_eq!(staged.lines.len(), 1);
}

#[test]
fn thick_gap_bridges_once_end_forks_are_pruned() {
    init_logging();
    // Thinning a width-3 stroke forks each end into two one-pixel twigs;
    // a short spur prune leaves a single path per stroke.
    let (left, right) = (thick_stroke(5, 20), thick_stroke(26, 40));
    let mask = GrayImage::from_fn(50, 21, |x, y| {
        Luma([if left(x, y) || right(x, y) { 255 } else { 0 }])
    });
    let bounds = Bounds::new(0.0, 0.0, 49.0, 20.0);
    let config = |tolerance: f64| PipelineConfig {
        spur_prune_length: 3,
        gap_bridge_tolerance: tolerance,
        ..PipelineConfig::default()
    };

    let merged = process_staged(&mask, bounds, &config(6.0)).unwrap();
    assert_eq!(merged.paths.len(), 2);
    assert_eq!(merged.lines.len(), 1);
    assert_eq!(merged.lines[0].len(), 31);

    let separate = process_staged(&mask, bounds, &config(4.0)).unwrap();
    assert_eq!(separate.lines.len(), 2);

    // Unpruned forks meet at their junctions, so each fragment's one join
    // is spent there and the gap stays open.
    let unpruned = process_staged(
        &mask,
        bounds,
        &PipelineConfig {
            gap_bridge_tolerance: 6.0,
            ..PipelineConfig::default()
        },
    )
    .unwrap();
    assert!(unpruned.lines.len() > 1);
}

#[test]
fn thinning_is_a_fixed_point() {
    for mask in [diagonal_band(40, 3, 36), y_mask()] {
        let once = skeletonize(&mask, StructuringElement::default());
        let twice = skeletonize(&once, StructuringElement::default());
        assert_eq!(once.as_raw(), twice.as_raw());
    }
}

#[test]
fn degree_classes_partition_the_skeleton() {
    let skeleton = skeletonize(&y_mask(), StructuringElement::default());
    let nodes = classify(&skeleton);
    for p in raster::set_pixels(&skeleton) {
        let degree = raster::degree(&skeleton, p);
        let is_end = nodes.endpoints.contains(&p);
        let is_junction = nodes.junctions.contains(&p);
        assert!(!(is_end && is_junction));
        assert_eq!(is_end, degree == 1);
        assert_eq!(is_junction, degree >= 3);
    }
}

#[test]
fn every_step_is_traced_exactly_once() {
    // A "Y", a detached segment, and a closed diamond with no node.
    let mut pixels: Vec<(u32, u32)> = Vec::new();
    for k in 1..=6 {
        pixels.push((10 - k, 10 - k));
        pixels.push((10 + k, 10 - k));
        pixels.push((10, 10 + k));
    }
    pixels.push((10, 10));
    pixels.extend((30..=45).map(|x| (x, 30)));
    for k in 0..4 {
        pixels.push((40 + k, 10 + k));
        pixels.push((44 - k, 14 + k));
        pixels.push((40 - k, 18 - k));
        pixels.push((36 + k, 14 - k));
    }
    let skeleton = mask_from(50, 40, &pixels);
    let graph = build_graph(&skeleton);
    let paths = trace_paths(&graph);

    let mut traced: BTreeMap<EdgeKey, usize> = BTreeMap::new();
    for path in &paths {
        assert!(path.len() >= 2);
        for w in path.windows(2) {
            *traced.entry(EdgeKey::new(w[0], w[1])).or_default() += 1;
        }
    }
    let mut expected: BTreeMap<EdgeKey, usize> = BTreeMap::new();
    for p in raster::set_pixels(&skeleton) {
        for q in raster::set_neighbors(&skeleton, p) {
            expected.insert(EdgeKey::new(p, q), 1);
        }
    }
    assert_eq!(traced, expected);
}

#[test]
fn zero_tolerance_bridging_is_identity() {
    let paths = vec![
        Polyline::new(vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)]),
        Polyline::new(vec![Point::new(3.0, 0.0), Point::new(6.0, 0.0)]),
    ];
    assert_eq!(bridge::bridge_gaps(paths.clone(), 0.0), paths);
}

#[test]
fn nearby_ends_snap_to_one_coordinate() {
    let line = |a: (f64, f64), b: (f64, f64)| {
        Polyline::new(vec![Point::new(a.0, a.1), Point::new(b.0, b.1)])
    };
    let lines = vec![
        line((10.0, 10.0), (0.0, 0.0)),
        line((30.0, 0.0), (10.3, 10.2)),
        line((10.1, 9.7), (10.0, 30.0)),
        line((50.0, 50.0), (60.0, 60.0)),
    ];
    let tolerance = 1.0;
    let originals: Vec<Point> = lines
        .iter()
        .flat_map(|l| [*l.first().unwrap(), *l.last().unwrap()])
        .collect();
    let snapped = topology::snap_endpoints(lines, tolerance);
    let after: Vec<Point> = snapped
        .iter()
        .flat_map(|l| [*l.first().unwrap(), *l.last().unwrap()])
        .collect();

    for i in 0..originals.len() {
        for j in (i + 1)..originals.len() {
            if originals[i].distance(originals[j]) <= tolerance {
                assert_eq!(after[i], after[j], "ends {i} and {j} were not snapped together");
            }
        }
    }
}

#[test]
fn smoothing_keeps_line_ends() {
    let input = Polyline::new(vec![
        Point::new(0.0, 0.0),
        Point::new(2.0, 5.0),
        Point::new(6.0, -1.0),
        Point::new(9.0, 4.0),
    ]);
    for iterations in 0..=PipelineConfig::MAX_SMOOTH_ITERATIONS {
        let out = topology::smooth_line(input.clone(), iterations);
        assert_eq!(out.first(), input.first());
        assert_eq!(out.last(), input.last());
    }
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let config = PipelineConfig {
        gap_bridge_tolerance: 6.0,
        snap_tolerance: 0.5,
        simplify_epsilon: 0.5,
        smooth_iterations: 2,
        min_path_length: 2,
        ..PipelineConfig::default()
    };
    let mask = y_mask();
    let bounds = Bounds::new(0.0, 0.0, 40.0, 40.0);
    let a = process_staged(&mask, bounds, &config).unwrap();
    let b = process_staged(&mask, bounds, &config).unwrap();
    assert_eq!(a.paths, b.paths);
    assert_eq!(a.lines, b.lines);
}

#[test]
fn full_cleanup_chain_stays_within_bounds() {
    init_logging();
    let config = PipelineConfig {
        snap_tolerance: 2.0,
        simplify_epsilon: 1.0,
        smooth_iterations: 3,
        min_line_length: 5.0,
        ..PipelineConfig::default()
    };
    let bounds = Bounds::new(-20.0, -20.0, 20.0, 20.0);
    let result = process(&y_mask(), bounds, &config).unwrap();
    assert_eq!(result.lines.len(), 3);
    for line in &result.lines {
        assert!(!line.is_degenerate());
        for p in line.points() {
            assert!((-20.0..=20.0).contains(&p.x) && (-20.0..=20.0).contains(&p.y));
        }
    }
    // All three arms meet at one snapped hub.
    let hub = Point::new(0.0, 0.0);
    let touching = result
        .lines
        .iter()
        .filter(|l| l.first() == Some(&hub) || l.last() == Some(&hub))
        .count();
    assert_eq!(touching, 3);
}
