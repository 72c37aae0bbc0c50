use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tokio::task;

use super::response::{error_response, Base64Body, ComparisonBody};
use super::AppState;
use crate::decode::encode_base64;
use crate::error::CompareError;
use crate::pipeline::{FIRST_FIELD, SECOND_FIELD};

pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
struct CompareRequest {
    #[serde(rename = "bfirstImg", default)]
    first: Option<String>,
    #[serde(rename = "bsecondImg", default)]
    second: Option<String>,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CompareError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CompareError::MissingParameter(field)),
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /comparison`
pub async fn compare_images(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    let request: CompareRequest = if body.is_empty() {
        CompareRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => return CompareError::MalformedRequest(e.to_string()).into_response(),
        }
    };

    let (first, second) = match (
        required(request.first, FIRST_FIELD),
        required(request.second, SECOND_FIELD),
    ) {
        (Ok(first), Ok(second)) => (first, second),
        (Err(e), _) | (_, Err(e)) => return e.into_response(),
    };

    let pipeline = state.pipeline.clone();
    let outcome = task::spawn_blocking(move || pipeline.run(&first, &second)).await;

    match outcome {
        Ok(Ok(result)) => {
            tracing::debug!("Annotated {} regions", result.regions);
            Json(ComparisonBody::from(&result)).into_response()
        }
        Ok(Err(e)) => e.into_response(),
        Err(join_error) => {
            CompareError::ComparisonFailure(format!("comparison task aborted: {join_error}"))
                .into_response()
        }
    }
}

/// `POST /base`: base64 of the uploaded `file` field
pub async fn file_to_base64(multipart: Result<Multipart, MultipartRejection>) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_response(e.status(), e.body_text()),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        return match field.bytes().await {
            Ok(bytes) => {
                tracing::debug!(
                    "Encoding upload {} ({} bytes)",
                    file_name.as_deref().unwrap_or("<unnamed>"),
                    bytes.len()
                );
                Json(Base64Body {
                    code: "200",
                    base64: encode_base64(&bytes),
                })
                .into_response()
            }
            Err(e) => error_response(e.status(), e.body_text()),
        };
    }

    CompareError::MissingParameter(UPLOAD_FIELD).into_response()
}
