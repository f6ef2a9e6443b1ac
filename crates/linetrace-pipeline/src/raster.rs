//! Pixel-level helpers shared by the skeleton, graph, and tracing stages.
//!
//! Every scan in this crate goes through these helpers so that pixel order
//! is the same everywhere: row-major for whole-image scans and the
//! canonical `dy = -1, 0, 1; dx = -1, 0, 1` order for neighborhoods.

use image::Luma;

use crate::types::{GrayImage, PixelCoord};

/// Sample value of a set pixel in every mask this crate produces.
pub const SET: u8 = 255;

/// Neighbor offsets in canonical scan order.
const OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Normalize a mask to 0/255: any non-zero sample becomes set.
#[must_use]
pub fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y).0[0] > 0 { SET } else { 0 }])
    })
}

/// Whether `p` lies inside the image and is non-zero.
#[must_use]
pub fn is_set(image: &GrayImage, p: PixelCoord) -> bool {
    p.x < image.width() && p.y < image.height() && image.get_pixel(p.x, p.y).0[0] > 0
}

/// Clear a pixel.
pub fn clear(image: &mut GrayImage, p: PixelCoord) {
    if p.x < image.width() && p.y < image.height() {
        image.put_pixel(p.x, p.y, Luma([0]));
    }
}

/// The in-bounds 8-neighborhood of `p`, in canonical order.
pub fn neighborhood(image: &GrayImage, p: PixelCoord) -> impl Iterator<Item = PixelCoord> {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let (x, y) = (i64::from(p.x), i64::from(p.y));
    OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let (nx, ny) = (x + dx, y + dy);
        if (0..width).contains(&nx) && (0..height).contains(&ny) {
            Some(PixelCoord::new(
                u32::try_from(nx).ok()?,
                u32::try_from(ny).ok()?,
            ))
        } else {
            None
        }
    })
}

/// Set 8-neighbors of `p`, in canonical order.
pub fn set_neighbors(image: &GrayImage, p: PixelCoord) -> impl Iterator<Item = PixelCoord> {
    neighborhood(image, p).filter(|&n| is_set(image, n))
}

/// Number of set 8-neighbors of `p`.
#[must_use]
pub fn degree(image: &GrayImage, p: PixelCoord) -> usize {
    set_neighbors(image, p).count()
}

/// Every set pixel in row-major order (top to bottom, left to right).
pub fn set_pixels(image: &GrayImage) -> impl Iterator<Item = PixelCoord> + '_ {
    image
        .enumerate_pixels()
        .filter(|(_, _, px)| px.0[0] > 0)
        .map(|(x, y, _)| PixelCoord::new(x, y))
}

/// Number of set pixels.
#[must_use]
pub fn count_set(image: &GrayImage) -> u64 {
    image.pixels().map(|p| u64::from(u8::from(p.0[0] > 0))).sum()
}
