//! Wire types for the pose API.

use common::error::PoseError;
use common::frame::{Plane, RawFrame};
use common::landmark::{DetectionResult, Landmark};
use serde::{Deserialize, Serialize};

/// Request to analyze a still image from disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessImageRequest {
    pub image_path: String,
}

/// Request to analyze the midpoint frame of a video file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessVideoRequest {
    pub video_path: String,
}

/// One camera plane as carried over the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlanePayload {
    /// Base64-encoded plane bytes.
    pub data: String,
    pub row_stride: usize,
    #[serde(default = "default_pixel_stride")]
    pub pixel_stride: usize,
}

fn default_pixel_stride() -> usize {
    1
}

/// A raw camera frame submitted for live analysis.
#[derive(Debug, Serialize, Deserialize)]
pub struct CameraFrameRequest {
    pub width: u32,
    pub height: u32,
    /// Pixel format tag as reported by the capture device.
    pub format: u32,
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Set for front-facing capture; the frame is mirrored before
    /// inference.
    #[serde(default)]
    pub mirror: bool,
    /// Small orientation correction in degrees. 0 disables rotation.
    #[serde(default)]
    pub rotation_degrees: f32,
    pub planes: Vec<PlanePayload>,
}

impl CameraFrameRequest {
    /// Decode the wire payload into a raw frame.
    pub fn into_raw_frame(self) -> Result<RawFrame, PoseError> {
        use base64::Engine;

        let mut planes = Vec::with_capacity(self.planes.len());
        for (index, plane) in self.planes.into_iter().enumerate() {
            let data = base64::engine::general_purpose::STANDARD
                .decode(plane.data.as_bytes())
                .map_err(|e| {
                    PoseError::decode(format!("plane {} is not valid base64: {}", index, e))
                })?;
            planes.push(Plane::new(data, plane.row_stride, plane.pixel_stride));
        }

        Ok(RawFrame {
            width: self.width,
            height: self.height,
            format: self.format,
            planes,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

/// Landmarks and measured latency for one analyzed frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct PoseResponse {
    pub landmarks: Vec<Landmark>,
    pub inference_time_ms: u64,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl From<DetectionResult> for PoseResponse {
    fn from(result: DetectionResult) -> Self {
        Self {
            landmarks: result.landmarks,
            inference_time_ms: result.inference_time_ms,
            frame_width: result.frame_width,
            frame_height: result.frame_height,
        }
    }
}

/// Detector lifecycle snapshot.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectorStatusResponse {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<crate::backend::DetectorConfig>,
}
