//! HTTP API for the pose service.

pub mod dto;
pub mod error;
pub mod routes;

use crate::state::PoseServiceState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn router(state: PoseServiceState) -> Router {
    Router::new()
        // Health and metrics endpoints
        .route("/healthz", get(routes::healthz))
        .route("/readyz", get(routes::readyz))
        .route("/metrics", get(routes::metrics))
        // Analysis operations
        .route("/v1/pose/image", post(routes::process_image))
        .route("/v1/pose/video", post(routes::process_video))
        .route("/v1/pose/camera-frame", post(routes::process_camera_frame))
        // Detector lifecycle
        .route(
            "/v1/detector",
            get(routes::detector_status)
                .put(routes::configure_detector)
                .delete(routes::release_detector),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
