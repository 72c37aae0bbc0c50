use std::io::Cursor;

use image::{ImageFormat, ImageReader, RgbImage};

use crate::error::CompareError;

fn invalid(field: &'static str, reason: impl Into<String>) -> CompareError {
    CompareError::InvalidImageFormat {
        field,
        reason: reason.into(),
    }
}

/// Check that `bytes` hold a readable image container
///
/// Only the magic bytes and the header are read; pixel data is left alone.
/// Returns the detected format and the header dimensions.
pub fn validate_image(
    field: &'static str,
    bytes: &[u8],
    max_pixels: u64,
) -> Result<(ImageFormat, (u32, u32)), CompareError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| invalid(field, e.to_string()))?;

    let format = reader
        .format()
        .ok_or_else(|| invalid(field, "unrecognised image container"))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| invalid(field, e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(invalid(field, "image has no pixels"));
    }

    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(invalid(
            field,
            format!("{}x{} exceeds the limit of {} pixels", width, height, max_pixels),
        ));
    }

    Ok((format, (width, height)))
}

/// Validate, then decode to a 3-channel RGB grid (alpha is discarded)
pub fn decode_image(
    field: &'static str,
    bytes: &[u8],
    max_pixels: u64,
) -> Result<(ImageFormat, RgbImage), CompareError> {
    let (format, _) = validate_image(field, bytes, max_pixels)?;

    let _span = tracing::debug_span!("decode_image", field).entered();
    let decoded = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| invalid(field, e.to_string()))?;

    Ok((format, decoded.to_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use image::Rgb;

    #[test]
    fn accepts_png_and_reports_header_dimensions() {
        let bytes = fixtures::png_bytes(&fixtures::solid(12, 7, Rgb([1, 2, 3])));
        let (format, dims) = validate_image("f", &bytes, u64::MAX).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(dims, (12, 7));
    }

    #[test]
    fn text_is_not_an_image() {
        let err = validate_image("bfirstImg", b"just some text, not pixels", u64::MAX).unwrap_err();
        assert!(matches!(
            err,
            CompareError::InvalidImageFormat {
                field: "bfirstImg",
                ..
            }
        ));
    }

    #[test]
    fn truncated_png_fails_decoding() {
        let bytes = fixtures::png_bytes(&fixtures::solid(32, 32, Rgb([9, 9, 9])));
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode_image("f", truncated, u64::MAX).is_err());
    }

    #[test]
    fn enforces_pixel_limit() {
        let bytes = fixtures::png_bytes(&fixtures::solid(20, 20, Rgb([0, 0, 0])));
        assert!(validate_image("f", &bytes, 400).is_ok());
        assert!(validate_image("f", &bytes, 399).is_err());
    }

    #[test]
    fn rgba_input_decodes_to_rgb() {
        let rgba = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 0]));
        let mut buf = Cursor::new(Vec::new());
        rgba.write_to(&mut buf, ImageFormat::Png).unwrap();

        let (_, rgb) = decode_image("f", buf.get_ref(), u64::MAX).unwrap();
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([10, 20, 30]));
    }
}
