use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn solid(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

/// Paint an axis-aligned block in place
pub fn paint_block(image: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    for py in y..y + height {
        for px in x..x + width {
            image.put_pixel(px, py, color);
        }
    }
}

/// White canvas with black blocks at the given `(x, y, w, h)` positions
pub fn white_with_blocks(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> RgbImage {
    let mut image = solid(width, height, WHITE);
    for &(x, y, w, h) in blocks {
        paint_block(&mut image, x, y, w, h, BLACK);
    }
    image
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

pub fn png_base64(image: &RgbImage) -> String {
    crate::decode::encode_base64(&png_bytes(image))
}
