//! HTTP handlers for the pose service.

use crate::api::dto::{
    CameraFrameRequest, DetectorStatusResponse, PoseResponse, ProcessImageRequest,
    ProcessVideoRequest,
};
use crate::api::error::ApiError;
use crate::backend::DetectorConfig;
use crate::state::PoseServiceState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Analyze a still image from disk.
pub async fn process_image(
    State(state): State<PoseServiceState>,
    Json(request): Json<ProcessImageRequest>,
) -> Result<Json<PoseResponse>, ApiError> {
    let result = state.process_image(&request.image_path).await?;
    Ok(Json(result.into()))
}

/// Analyze the midpoint frame of a video file.
pub async fn process_video(
    State(state): State<PoseServiceState>,
    Json(request): Json<ProcessVideoRequest>,
) -> Result<Json<PoseResponse>, ApiError> {
    let result = state.process_video(&request.video_path).await?;
    Ok(Json(result.into()))
}

/// Analyze one live camera frame.
pub async fn process_camera_frame(
    State(state): State<PoseServiceState>,
    Json(request): Json<CameraFrameRequest>,
) -> Result<Json<PoseResponse>, ApiError> {
    let mirror = request.mirror;
    let rotation_degrees = request.rotation_degrees;
    let frame = request.into_raw_frame()?;

    let result = state
        .process_camera_frame(frame, mirror, rotation_degrees)
        .await?;
    Ok(Json(result.into()))
}

/// Current detector lifecycle state and options.
pub async fn detector_status(State(state): State<PoseServiceState>) -> impl IntoResponse {
    let (manager_state, config) = state.detector_status().await;
    Json(DetectorStatusResponse {
        state: manager_state.as_str().to_string(),
        config,
    })
}

/// Apply a new detector configuration, releasing the current instance
/// first.
pub async fn configure_detector(
    State(state): State<PoseServiceState>,
    Json(config): Json<DetectorConfig>,
) -> Result<Json<DetectorStatusResponse>, ApiError> {
    let (manager_state, config) = state.configure_detector(config).await?;
    Ok(Json(DetectorStatusResponse {
        state: manager_state.as_str().to_string(),
        config,
    }))
}

/// Release the detector; releasing twice is a no-op.
pub async fn release_detector(
    State(state): State<PoseServiceState>,
) -> Result<Json<DetectorStatusResponse>, ApiError> {
    let manager_state = state.release_detector().await?;
    Ok(Json(DetectorStatusResponse {
        state: manager_state.as_str().to_string(),
        config: None,
    }))
}

/// Health check endpoint
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "pose-service",
        })),
    )
}

/// Readiness check endpoint
pub async fn readyz(State(state): State<PoseServiceState>) -> impl IntoResponse {
    let (manager_state, _) = state.detector_status().await;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "detector": manager_state.as_str(),
            "node_id": state.node_id(),
        })),
    )
}

/// Metrics endpoint (Prometheus format)
pub async fn metrics() -> impl IntoResponse {
    match telemetry::metrics::encode_metrics() {
        Ok(body) => body.into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}
