use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

use super::types::Region;

/// Colour used for both boxes and fills
pub const MARK_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Box outline thickness in pixels
pub const STROKE_WIDTH: u32 = 2;

/// Rendered outputs of one comparison
#[derive(Debug, Clone)]
pub struct Annotations {
    /// First input with boxes
    pub square_first: RgbImage,
    /// Second input with boxes
    pub square_second: RgbImage,
    /// Second input with regions filled
    pub filled_second: RgbImage,
    /// Regions filled on black, shaped like the first input
    pub mask: RgbImage,
}

/// Draw every region in square and fill mode
///
/// The inputs are left untouched; all drawing happens on copies.
pub fn annotate(first: &RgbImage, second: &RgbImage, regions: &[Region]) -> Annotations {
    let _span = tracing::debug_span!("annotate").entered();

    let mut square_first = first.clone();
    let mut square_second = second.clone();
    let mut filled_second = second.clone();
    let mut mask = RgbImage::new(first.width(), first.height());

    for region in regions {
        draw_box(&mut square_first, region);
        draw_box(&mut square_second, region);
        fill_region(&mut mask, region);
        fill_region(&mut filled_second, region);
    }

    Annotations {
        square_first,
        square_second,
        filled_second,
        mask,
    }
}

/// Outline from `(x, y)` to `(x + width, y + height)`, stroke centred on the edge
fn draw_box(canvas: &mut RgbImage, region: &Region) {
    let half = (STROKE_WIDTH / 2) as i32;
    for i in 0..STROKE_WIDTH as i32 {
        let inset = i - half;
        let width = region.width as i32 + 1 - 2 * inset;
        let height = region.height as i32 + 1 - 2 * inset;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect = Rect::at(region.x as i32 + inset, region.y as i32 + inset)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(canvas, rect, MARK_COLOR);
    }
}

/// Solid polygon over the region's contour, boundary included
fn fill_region(canvas: &mut RgbImage, region: &Region) {
    let polygon = open_polygon(&region.contour);
    if polygon.len() < 3 {
        for p in polygon {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < canvas.width() && (p.y as u32) < canvas.height() {
                canvas.put_pixel(p.x as u32, p.y as u32, MARK_COLOR);
            }
        }
        return;
    }
    draw_polygon_mut(canvas, polygon, MARK_COLOR);
}

/// Polygon drawing wants the closing vertex implied, not repeated
fn open_polygon(points: &[Point<i32>]) -> &[Point<i32>] {
    match points {
        [first, .., last] if first == last => &points[..points.len() - 1],
        _ => points,
    }
}
