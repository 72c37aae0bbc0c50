use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;
use imageproc::point::Point;

use super::types::Region;

/// Find the areas of low similarity in a difference map
///
/// Steps:
/// 1. Pick a threshold with Otsu's method
/// 2. Mark pixels at or below it as foreground (inverse binary)
/// 3. Trace the outer contours of the foreground, including blobs that touch
///    the image edge
/// 4. Drop contours enclosing `min_area` or less
///
/// Regions are returned sorted top-to-bottom, then left-to-right.
pub fn extract_regions(diff: GrayImage, min_area: f64) -> Vec<Region> {
    let _span = tracing::debug_span!("extract_regions").entered();

    let binary = threshold_inverse_otsu(diff);

    let contours: Vec<Contour<i32>> = find_contours(&with_background_frame(&binary));
    let traced = contours.len();

    let mut regions: Vec<Region> = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let points: Vec<Point<i32>> = c
                .points
                .into_iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            let area = polygon_area(&points);
            (area > min_area).then(|| region_from_points(points, area))
        })
        .collect();

    regions.sort_by_key(|r| (r.y, r.x));

    tracing::debug!(
        "Kept {} of {} contours (area > {})",
        regions.len(),
        traced,
        min_area
    );

    regions
}

/// Foreground (255) wherever similarity is at or below the Otsu level
///
/// A flat map has nothing to split: it is foreground only when every pixel is
/// fully dissimilar.
fn threshold_inverse_otsu(mut diff: GrayImage) -> GrayImage {
    let (lo, hi) = diff
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    let level = if lo == hi { 0 } else { otsu_level(&diff) };
    tracing::debug!("Otsu level {} (map range {}..={})", level, lo, hi);

    for pixel in diff.pixels_mut() {
        pixel[0] = if pixel[0] <= level { 255 } else { 0 };
    }
    diff
}

/// Copy of `binary` inside a one pixel background border
///
/// The border follower never starts on a foreground pixel in the outermost
/// row or column, so blobs touching the edge are only traced once padded.
/// Points traced on the result are offset by (1, 1).
fn with_background_frame(binary: &GrayImage) -> GrayImage {
    let mut framed = GrayImage::new(binary.width() + 2, binary.height() + 2);
    imageops::replace(&mut framed, binary, 1, 1);
    framed
}

/// Shoelace area of a closed polygon
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    (twice as f64 / 2.0).abs()
}

fn region_from_points(points: Vec<Point<i32>>, area: f64) -> Region {
    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
        |(min_x, min_y, max_x, max_y), p| {
            (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
        },
    );

    Region {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
        area,
        contour: points,
    }
}
