use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::CompareError;
use crate::pipeline::ComparisonResult;

/// `{ "code": "<status>", "error": "<message>" }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ComparisonBody {
    pub code: &'static str,
    pub ssim: String,
    #[serde(rename = "squareImg")]
    pub square_img: String,
    #[serde(rename = "fillImg")]
    pub fill_img: String,
}

impl From<&ComparisonResult> for ComparisonBody {
    fn from(result: &ComparisonResult) -> Self {
        Self {
            code: "200",
            // Debug keeps a trailing ".0" on whole numbers ("1.0", not "1")
            ssim: format!("{:?}", result.score),
            square_img: result.square_base64(),
            fill_img: result.fill_base64(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Base64Body {
    pub code: &'static str,
    pub base64: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        code: status.as_u16().to_string(),
        error: message.into(),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for CompareError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }
        error_response(status, self.public_message())
    }
}
