use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::error::CompareError;

/// Standard alphabet, padding optional on input
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 request parameter
///
/// Accepts MIME-style line wrapping and an optional `data:<mime>;base64,`
/// prefix, both of which browsers and canvas APIs commonly produce.
pub fn decode_base64(field: &'static str, payload: &str) -> Result<Vec<u8>, CompareError> {
    let payload = strip_data_url(payload.trim());
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if compact.is_empty() {
        return Err(CompareError::MissingParameter(field));
    }

    LENIENT
        .decode(compact.as_bytes())
        .map_err(|source| CompareError::InvalidEncoding { field, source })
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

fn strip_data_url(payload: &str) -> &str {
    if !payload.starts_with("data:") {
        return payload;
    }
    match payload.split_once(',') {
        Some((header, body)) if header.ends_with(";base64") => body,
        _ => payload,
    }
}
