//! Skeleton extraction: morphological thinning, node classification, and
//! spur pruning.
//!
//! Thinning is the Lantuéjoul morphological skeleton: at every erosion
//! depth the pixels removed by an opening are the ones that only exist at
//! that scale, and their union over all depths is the skeleton.

use image::Luma;
use imageproc::distance_transform::Norm;

use crate::raster::{self, SET};
use crate::types::{GrayImage, KernelShape, PixelCoord, StructuringElement};

/// A thinned mask plus its classified nodes.
#[derive(Debug, Clone)]
pub struct Skeleton {
    /// Skeleton raster (0/255), same dimensions as the source mask.
    pub image: GrayImage,
    /// Pixels with exactly one set neighbor, row-major.
    pub endpoints: Vec<PixelCoord>,
    /// Pixels with three or more set neighbors, row-major.
    pub junctions: Vec<PixelCoord>,
}

/// Endpoint and junction lists for a skeleton raster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeClassification {
    /// Degree-1 pixels.
    pub endpoints: Vec<PixelCoord>,
    /// Degree-3+ pixels.
    pub junctions: Vec<PixelCoord>,
}

const fn norm_for(shape: KernelShape) -> Norm {
    match shape {
        KernelShape::Cross => Norm::L1,
        KernelShape::Square => Norm::LInf,
    }
}

/// Morphological skeleton of `mask` under `element`.
///
/// Repeats `opened = open(working)`, `skeleton |= working - opened`,
/// `working = erode(working)` until `working` is empty. The working buffer
/// carries a one-pixel background border so pixels on the image edge erode
/// like interior ones; the result is cropped back to the mask's size.
#[must_use]
pub fn skeletonize(mask: &GrayImage, element: StructuringElement) -> GrayImage {
    let (width, height) = mask.dimensions();
    let norm = norm_for(element.shape);
    let radius = element.radius();

    let mut working = GrayImage::new(width + 2, height + 2);
    for p in raster::set_pixels(mask) {
        working.put_pixel(p.x + 1, p.y + 1, Luma([SET]));
    }
    let mut accumulated = GrayImage::new(width + 2, height + 2);

    // Every erosion strips at least the outer layer of each component.
    let max_rounds = width.max(height) + 2;
    for _ in 0..max_rounds {
        if raster::count_set(&working) == 0 {
            break;
        }
        let opened = imageproc::morphology::open(&working, norm, radius);
        for (x, y, px) in working.enumerate_pixels() {
            if px.0[0] > 0 && opened.get_pixel(x, y).0[0] == 0 {
                accumulated.put_pixel(x, y, Luma([SET]));
            }
        }
        working = imageproc::morphology::erode(&working, norm, radius);
    }

    image::imageops::crop_imm(&accumulated, 1, 1, width, height).to_image()
}

/// Classify skeleton pixels by their number of set 8-neighbors.
///
/// Degree 0 (isolated) and degree 2 (interior) pixels appear in neither
/// list.
#[must_use]
pub fn classify(skeleton: &GrayImage) -> NodeClassification {
    let mut out = NodeClassification::default();
    for p in raster::set_pixels(skeleton) {
        match raster::degree(skeleton, p) {
            1 => out.endpoints.push(p),
            d if d > 2 => out.junctions.push(p),
            _ => {}
        }
    }
    out
}

/// Outcome of walking from an endpoint along degree-2 pixels.
enum Walk {
    /// Reached a junction; holds the chain (endpoint first, junction
    /// excluded) and the junction.
    Spur(Vec<PixelCoord>, PixelCoord),
    /// Reached another endpoint: the whole chain is an isolated fragment
    /// (both endpoints included).
    Fragment(Vec<PixelCoord>),
    /// The chain grew longer than the limit.
    Keep,
}

fn walk_from_endpoint(image: &GrayImage, start: PixelCoord, max_length: usize) -> Walk {
    let mut chain = vec![start];
    let mut prev = None;
    let mut current = start;
    loop {
        let Some(next) = raster::set_neighbors(image, current).find(|&n| Some(n) != prev) else {
            return Walk::Keep;
        };
        match raster::degree(image, next) {
            2 => {
                chain.push(next);
                if chain.len() > max_length {
                    return Walk::Keep;
                }
                prev = Some(current);
                current = next;
            }
            d if d > 2 => return Walk::Spur(chain, next),
            _ => {
                chain.push(next);
                return if chain.len() <= max_length {
                    Walk::Fragment(chain)
                } else {
                    Walk::Keep
                };
            }
        }
    }
}

/// Whether the set neighbors of `p` form one 8-connected group among
/// themselves, so that clearing `p` does not split the skeleton locally.
fn is_removable(image: &GrayImage, p: PixelCoord) -> bool {
    let ring: Vec<PixelCoord> = raster::set_neighbors(image, p).collect();
    if ring.len() < 2 {
        return false;
    }
    let touches = |a: PixelCoord, b: PixelCoord| a.x.abs_diff(b.x) <= 1 && a.y.abs_diff(b.y) <= 1;
    let mut reached = vec![false; ring.len()];
    let mut stack = vec![0];
    reached[0] = true;
    while let Some(i) = stack.pop() {
        for (j, &q) in ring.iter().enumerate() {
            if !reached[j] && touches(ring[i], q) {
                reached[j] = true;
                stack.push(j);
            }
        }
    }
    reached.iter().all(|&r| r)
}

/// Remove dead-end branches of at most `max_length` pixels.
///
/// Endpoints are taken once from the input, in row-major order. From each
/// one the walk follows degree-2 pixels; if it reaches a junction within
/// `max_length` pixels the chain is cleared, and so is the junction pixel
/// when its remaining neighbors stay connected without it. A walk that ends
/// at another endpoint within `max_length` pixels (endpoints included)
/// clears the whole isolated fragment. `max_length == 0` returns the input
/// unchanged.
#[must_use]
pub fn prune_spurs(skeleton: &GrayImage, max_length: usize) -> GrayImage {
    let mut out = skeleton.clone();
    if max_length == 0 {
        return out;
    }
    let endpoints = classify(skeleton).endpoints;
    let mut pruned = 0_usize;
    for endpoint in endpoints {
        if !raster::is_set(&out, endpoint) || raster::degree(&out, endpoint) != 1 {
            continue;
        }
        match walk_from_endpoint(&out, endpoint, max_length) {
            Walk::Spur(chain, junction) => {
                for &p in &chain {
                    raster::clear(&mut out, p);
                }
                if is_removable(&out, junction) {
                    raster::clear(&mut out, junction);
                }
                pruned += 1;
            }
            Walk::Fragment(chain) => {
                for &p in &chain {
                    raster::clear(&mut out, p);
                }
                pruned += 1;
            }
            Walk::Keep => {}
        }
    }
    log::debug!("pruned {pruned} spurs of at most {max_length} px");
    out
}

/// Thin, prune, and classify a binary mask.
#[must_use]
pub fn extract(mask: &GrayImage, element: StructuringElement, max_spur_length: usize) -> Skeleton {
    let binary = raster::binarize(mask);
    let thinned = skeletonize(&binary, element);
    let image = prune_spurs(&thinned, max_spur_length);
    let NodeClassification {
        endpoints,
        junctions,
    } = classify(&image);
    log::debug!(
        "skeleton: {} px, {} endpoints, {} junctions",
        raster::count_set(&image),
        endpoints.len(),
        junctions.len(),
    );
    Skeleton {
        image,
        endpoints,
        junctions,
    }
}
