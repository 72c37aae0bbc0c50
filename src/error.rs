use axum::http::StatusCode;

/// Failures a comparison request can end in
///
/// The first four are caller mistakes and are reported back verbatim. The
/// last two are server-side and only their generic message leaves the process.
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("request body is not valid JSON: {0}")]
    MalformedRequest(String),

    #[error("parameter {field} is not valid base64")]
    InvalidEncoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("parameter {field} is not a supported image: {reason}")]
    InvalidImageFormat { field: &'static str, reason: String },

    #[error("image comparison failed: {0}")]
    ComparisonFailure(String),

    #[error("failed to encode comparison output: {0}")]
    EncodingFailure(String),
}

impl CompareError {
    pub fn comparison(err: anyhow::Error) -> Self {
        Self::ComparisonFailure(format!("{err:#}"))
    }

    pub fn encoding(err: anyhow::Error) -> Self {
        Self::EncodingFailure(format!("{err:#}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_)
            | Self::MalformedRequest(_)
            | Self::InvalidEncoding { .. }
            | Self::InvalidImageFormat { .. } => StatusCode::BAD_REQUEST,
            Self::ComparisonFailure(_) | Self::EncodingFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller
    pub fn public_message(&self) -> String {
        match self {
            Self::ComparisonFailure(_) => "server error, image comparison failed".to_string(),
            Self::EncodingFailure(_) => "server error, could not encode comparison output".to_string(),
            other => other.to_string(),
        }
    }
}
