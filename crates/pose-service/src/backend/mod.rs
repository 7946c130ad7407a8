//! Model backend seam.
//!
//! The detector is an opaque capability behind [`PoseModel`]: the service
//! verifies its behavior through configuration, detection calls, and
//! release, never through backend internals. [`PoseModelFactory`] builds
//! instances; the lifecycle manager owns at most one at a time.

pub mod synthetic;

use async_trait::async_trait;
use common::error::PoseError;
use common::frame::NormalizedImage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Operating mode of the detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningMode {
    /// Synchronous single-image analysis.
    #[default]
    Image,
    /// Synchronous analysis of frames extracted from video files.
    Video,
    /// Asynchronous analysis of camera frames; results arrive on a sink.
    LiveStream,
}

impl RunningMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::LiveStream => "live_stream",
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::LiveStream)
    }
}

/// Model variant, trading accuracy against latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Lite,
    #[default]
    Full,
    Heavy,
}

/// Compute backend the model runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDelegate {
    #[default]
    Cpu,
    Gpu,
}

/// Immutable detector options.
///
/// A live detector's options are never mutated in place: reconfiguration
/// goes through the lifecycle manager, which releases the current instance
/// and builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default)]
    pub running_mode: RunningMode,
    #[serde(default)]
    pub model_variant: ModelVariant,
    #[serde(default)]
    pub delegate: ComputeDelegate,
    #[serde(default = "default_confidence")]
    pub min_detection_confidence: f32,
    #[serde(default = "default_confidence")]
    pub min_tracking_confidence: f32,
    #[serde(default = "default_confidence")]
    pub min_presence_confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            running_mode: RunningMode::default(),
            model_variant: ModelVariant::default(),
            delegate: ComputeDelegate::default(),
            min_detection_confidence: default_confidence(),
            min_tracking_confidence: default_confidence(),
            min_presence_confidence: default_confidence(),
        }
    }
}

impl DetectorConfig {
    /// Check that every confidence threshold lies in [0, 1].
    pub fn validate(&self) -> Result<(), PoseError> {
        for (name, value) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence", self.min_tracking_confidence),
            ("min_presence_confidence", self.min_presence_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PoseError::configuration(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Visibility as reported by a model backend.
///
/// Backends disagree on the shape: some wrap the value in an optional
/// container, some emit a bare number. The distinction is collapsed exactly
/// once, at the output boundary, by [`Self::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilityValue {
    /// Optional container, value present.
    Present(f32),
    /// Optional container, value absent.
    Absent,
    /// Bare numeric value.
    Raw(f32),
}

impl VisibilityValue {
    /// Collapse to a plain confidence in [0, 1].
    ///
    /// Absent or non-finite values resolve to 0.0. Visibility is
    /// best-effort metadata and never fails a detection.
    pub fn resolve(self) -> f32 {
        match self {
            Self::Present(v) | Self::Raw(v) if v.is_finite() => v.clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// One raw keypoint from a model backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: VisibilityValue,
}

/// One detected body's keypoints.
#[derive(Debug, Clone, Default)]
pub struct RawPose {
    pub landmarks: Vec<RawLandmark>,
}

/// Raw detector output: zero or more bodies. Empty output is a valid
/// result, not an error.
#[derive(Debug, Clone, Default)]
pub struct RawPoseOutput {
    pub poses: Vec<RawPose>,
}

/// A live-stream result as emitted by an asynchronous detector.
#[derive(Debug)]
pub struct LiveResult {
    /// Caller-supplied frame timestamp, echoed back unchanged.
    pub timestamp_ms: u64,
    pub outcome: Result<RawPoseOutput, PoseError>,
}

/// Destination for asynchronously delivered live-stream results.
pub type LiveResultSink = mpsc::UnboundedSender<LiveResult>;

/// A built pose detector.
#[async_trait]
pub trait PoseModel: Send + Sync {
    /// The immutable options this detector was built with.
    fn config(&self) -> &DetectorConfig;

    /// Synchronous detection for image and video modes. Suspends the
    /// caller until the result is available.
    async fn detect(&self, image: &NormalizedImage) -> Result<RawPoseOutput, PoseError>;

    /// Live-stream submission: enqueue the frame and return immediately.
    /// The result arrives later on the sink supplied at build time.
    async fn detect_async(
        &self,
        image: NormalizedImage,
        timestamp_ms: u64,
    ) -> Result<(), PoseError>;

    /// Release underlying resources. Idempotent. Results still in flight
    /// are abandoned, not delivered.
    async fn close(&mut self) -> Result<(), PoseError>;
}

/// Builds detector instances for the lifecycle manager.
#[async_trait]
pub trait PoseModelFactory: Send + Sync {
    /// Build a detector for `config`. `sink` must be `Some` exactly when
    /// the mode is live-stream; the lifecycle manager enforces this before
    /// calling.
    async fn build(
        &self,
        config: DetectorConfig,
        sink: Option<LiveResultSink>,
    ) -> Result<Box<dyn PoseModel>, PoseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_resolution() {
        assert_eq!(VisibilityValue::Present(0.8).resolve(), 0.8);
        assert_eq!(VisibilityValue::Raw(0.3).resolve(), 0.3);
        assert_eq!(VisibilityValue::Absent.resolve(), 0.0);
    }

    #[test]
    fn test_visibility_clamps_out_of_range_values() {
        assert_eq!(VisibilityValue::Present(1.7).resolve(), 1.0);
        assert_eq!(VisibilityValue::Raw(-0.2).resolve(), 0.0);
    }

    #[test]
    fn test_visibility_non_finite_resolves_to_zero() {
        assert_eq!(VisibilityValue::Present(f32::NAN).resolve(), 0.0);
        assert_eq!(VisibilityValue::Raw(f32::INFINITY).resolve(), 0.0);
    }

    #[test]
    fn test_config_defaults() {
        let config = DetectorConfig::default();
        assert_eq!(config.running_mode, RunningMode::Image);
        assert_eq!(config.model_variant, ModelVariant::Full);
        assert_eq!(config.delegate, ComputeDelegate::Cpu);
        assert_eq!(config.min_detection_confidence, 0.5);
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"running_mode": "live_stream"}"#).unwrap();
        assert_eq!(config.running_mode, RunningMode::LiveStream);
        assert_eq!(config.min_detection_confidence, 0.5);
        assert_eq!(config.min_tracking_confidence, 0.5);
    }

    #[test]
    fn test_config_validation_rejects_out_of_range_thresholds() {
        let mut config = DetectorConfig {
            min_detection_confidence: 1.5,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());

        config.min_detection_confidence = -0.1;
        assert!(config.validate().is_err());

        config.min_detection_confidence = f32::NAN;
        assert!(config.validate().is_err());

        config.min_detection_confidence = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_running_mode_labels() {
        assert_eq!(RunningMode::Image.as_str(), "image");
        assert_eq!(RunningMode::Video.as_str(), "video");
        assert_eq!(RunningMode::LiveStream.as_str(), "live_stream");
        assert!(RunningMode::LiveStream.is_live());
        assert!(!RunningMode::Video.is_live());
    }
}
