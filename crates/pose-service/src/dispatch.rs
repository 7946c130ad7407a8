//! Routing of prepared images to the detector by operating mode.

use crate::backend::{PoseModel, RawPoseOutput};
use common::error::PoseError;
use common::frame::NormalizedImage;
use std::time::Instant;
use telemetry::metrics::POSE_INFERENCE_LATENCY;
use tracing::debug;

/// Synchronous detection for image and video modes.
///
/// Returns the raw output together with the measured latency in
/// milliseconds, from call start to return.
pub async fn detect_blocking(
    model: &dyn PoseModel,
    image: &NormalizedImage,
) -> Result<(RawPoseOutput, u64), PoseError> {
    let mode = model.config().running_mode;
    if mode.is_live() {
        return Err(PoseError::processing(
            "synchronous detection requested while the detector is in live_stream mode",
        ));
    }

    let start = Instant::now();
    let output = model.detect(image).await?;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    POSE_INFERENCE_LATENCY
        .with_label_values(&[mode.as_str()])
        .observe(elapsed_ms as f64 / 1000.0);
    debug!(
        mode = mode.as_str(),
        inference_time_ms = elapsed_ms,
        poses = output.poses.len(),
        "detection completed"
    );

    Ok((output, elapsed_ms))
}

/// Live-stream submission: enqueue the frame and return immediately. The
/// result arrives on the sink the detector was built with.
pub async fn submit_live(
    model: &dyn PoseModel,
    image: NormalizedImage,
    timestamp_ms: u64,
) -> Result<(), PoseError> {
    if !model.config().running_mode.is_live() {
        return Err(PoseError::processing(
            "live submission requested while the detector is not in live_stream mode",
        ));
    }
    model.detect_async(image, timestamp_ms).await
}
