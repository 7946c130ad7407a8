//! Normalization of raw detector output into canonical landmark records.

use crate::backend::RawPoseOutput;
use common::landmark::{DetectionResult, Landmark};

/// Flatten raw detector output into the canonical landmark sequence.
///
/// Only the first detected body is retained. Empty output maps to an empty
/// landmark list, never an error: "no person in frame" is a valid answer.
pub fn normalize_output(
    output: RawPoseOutput,
    inference_time_ms: u64,
    frame_width: u32,
    frame_height: u32,
) -> DetectionResult {
    let landmarks = output
        .poses
        .into_iter()
        .next()
        .map(|pose| {
            pose.landmarks
                .into_iter()
                .map(|lm| Landmark {
                    x: lm.x,
                    y: lm.y,
                    z: lm.z,
                    visibility: lm.visibility.resolve(),
                })
                .collect()
        })
        .unwrap_or_default();

    DetectionResult {
        landmarks,
        inference_time_ms,
        frame_width,
        frame_height,
    }
}
