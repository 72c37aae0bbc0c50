mod payload;
mod validate;

pub use payload::{decode_base64, encode_base64};
pub use validate::decode_image;

use image::{ImageFormat, RgbImage};

/// A request image after base64 decoding, container validation and pixel decoding
#[derive(Debug, Clone)]
pub struct DecodedInput {
    pub format: ImageFormat,
    /// The decoded payload exactly as the caller sent it
    pub bytes: Vec<u8>,
    pub image: RgbImage,
}

impl DecodedInput {
    /// File extension matching the detected container
    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

/// Run the whole decoder for one request field
pub fn decode_input(
    field: &'static str,
    payload: &str,
    max_pixels: u64,
) -> Result<DecodedInput, crate::error::CompareError> {
    let bytes = decode_base64(field, payload)?;
    let (format, image) = decode_image(field, &bytes, max_pixels)?;

    tracing::debug!(
        "Decoded {}: {:?} {}x{}",
        field,
        format,
        image.width(),
        image.height()
    );

    Ok(DecodedInput {
        format,
        bytes,
        image,
    })
}
