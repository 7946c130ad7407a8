//! HTTP mapping for pipeline errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::error::PoseError;
use serde_json::json;

/// Wrapper that maps the error taxonomy onto HTTP status codes and
/// serializes the tagged (kind, message) pair callers branch on.
#[derive(Debug)]
pub struct ApiError(pub PoseError);

impl From<PoseError> for ApiError {
    fn from(err: PoseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PoseError::Configuration(_) | PoseError::Decode(_) => StatusCode::BAD_REQUEST,
            PoseError::Busy(_) => StatusCode::CONFLICT,
            PoseError::Detection(_) | PoseError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "kind": self.0.kind(),
            "error": self.0.to_string(),
        }));

        (status, body).into_response()
    }
}
