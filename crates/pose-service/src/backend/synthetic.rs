//! Deterministic synthetic landmarker.
//!
//! Default backend for the service wiring and the test suite. Derives a
//! plausible 33-point skeleton from image statistics instead of running a
//! real model, so the whole pipeline stays exercisable without model files
//! or accelerator hardware.

use super::{
    ComputeDelegate, DetectorConfig, LiveResult, LiveResultSink, PoseModel, PoseModelFactory,
    RawLandmark, RawPose, RawPoseOutput, VisibilityValue,
};
use async_trait::async_trait;
use common::error::PoseError;
use common::frame::NormalizedImage;
use common::landmark::PoseLandmark;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Luma spread below which a frame is considered blank.
const MIN_SPREAD: u8 = 8;

/// Options for the synthetic backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Simulated inference delay in milliseconds.
    #[serde(default)]
    pub simulated_delay_ms: u64,
    /// Whether the backend accepts the GPU delegate.
    #[serde(default)]
    pub supports_gpu: bool,
}

/// Factory for synthetic detectors, with instance accounting.
pub struct SyntheticPoseFactory {
    config: SyntheticConfig,
    open_instances: Arc<AtomicUsize>,
    built_total: Arc<AtomicUsize>,
}

impl SyntheticPoseFactory {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            open_instances: Arc::new(AtomicUsize::new(0)),
            built_total: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Detectors currently open (built and not yet closed).
    pub fn open_instances(&self) -> usize {
        self.open_instances.load(Ordering::SeqCst)
    }

    /// Successful builds since the factory was created.
    pub fn built_total(&self) -> usize {
        self.built_total.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticPoseFactory {
    fn default() -> Self {
        Self::new(SyntheticConfig::default())
    }
}

#[async_trait]
impl PoseModelFactory for SyntheticPoseFactory {
    async fn build(
        &self,
        config: DetectorConfig,
        sink: Option<LiveResultSink>,
    ) -> Result<Box<dyn PoseModel>, PoseError> {
        if config.delegate == ComputeDelegate::Gpu && !self.config.supports_gpu {
            return Err(PoseError::configuration(
                "gpu delegate is not available on this backend",
            ));
        }

        self.open_instances.fetch_add(1, Ordering::SeqCst);
        self.built_total.fetch_add(1, Ordering::SeqCst);
        debug!(
            mode = config.running_mode.as_str(),
            variant = ?config.model_variant,
            "built synthetic detector"
        );

        Ok(Box::new(SyntheticPoseModel {
            config,
            sink,
            delay_ms: self.config.simulated_delay_ms,
            cancel: CancellationToken::new(),
            closed: false,
            open_instances: self.open_instances.clone(),
        }))
    }
}

/// A single synthetic detector instance.
pub struct SyntheticPoseModel {
    config: DetectorConfig,
    sink: Option<LiveResultSink>,
    delay_ms: u64,
    cancel: CancellationToken,
    closed: bool,
    open_instances: Arc<AtomicUsize>,
}

#[async_trait]
impl PoseModel for SyntheticPoseModel {
    fn config(&self) -> &DetectorConfig {
        &self.config
    }

    async fn detect(&self, image: &NormalizedImage) -> Result<RawPoseOutput, PoseError> {
        if self.closed {
            return Err(PoseError::detection("detector already released"));
        }
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
        Ok(synthesize(image, &self.config))
    }

    async fn detect_async(
        &self,
        image: NormalizedImage,
        timestamp_ms: u64,
    ) -> Result<(), PoseError> {
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| PoseError::configuration("live submission requires a result sink"))?;
        let config = self.config;
        let delay_ms = self.delay_ms;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(timestamp_ms, "live inference abandoned by release");
                }
                _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                    let outcome = Ok(synthesize(&image, &config));
                    let _ = sink.send(LiveResult { timestamp_ms, outcome });
                }
            }
        });

        Ok(())
    }

    async fn close(&mut self) -> Result<(), PoseError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cancel.cancel();
        self.open_instances.fetch_sub(1, Ordering::SeqCst);
        info!("synthetic detector released");
        Ok(())
    }
}

struct ImageStats {
    mean: f32,
    spread: u8,
    centroid_x: f32,
    centroid_y: f32,
}

impl ImageStats {
    fn measure(image: &NormalizedImage) -> Option<Self> {
        if image.pixel_count() == 0 {
            return None;
        }

        let mut sum = 0u64;
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut weighted_x = 0.0f64;
        let mut weighted_y = 0.0f64;
        let mut weight = 0.0f64;

        for y in 0..image.height {
            for x in 0..image.width {
                let [r, g, b, _] = image.get_pixel(x, y);
                let luma =
                    (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)) as u8;
                sum += u64::from(luma);
                min = min.min(luma);
                max = max.max(luma);
                weighted_x += f64::from(luma) * f64::from(x);
                weighted_y += f64::from(luma) * f64::from(y);
                weight += f64::from(luma);
            }
        }

        let mean = (sum as f64 / image.pixel_count() as f64) as f32;
        let denom_x = f64::from(image.width.saturating_sub(1).max(1));
        let denom_y = f64::from(image.height.saturating_sub(1).max(1));
        let (centroid_x, centroid_y) = if weight > 0.0 {
            (
                (weighted_x / weight / denom_x) as f32,
                (weighted_y / weight / denom_y) as f32,
            )
        } else {
            (0.5, 0.5)
        };

        Some(Self {
            mean,
            spread: max - min,
            centroid_x: centroid_x.clamp(0.0, 1.0),
            centroid_y: centroid_y.clamp(0.0, 1.0),
        })
    }
}

/// Derive a skeleton from image statistics. Deterministic for a given
/// image and configuration.
fn synthesize(image: &NormalizedImage, config: &DetectorConfig) -> RawPoseOutput {
    let Some(stats) = ImageStats::measure(image) else {
        return RawPoseOutput::default();
    };

    // A uniform frame carries no structure to anchor a skeleton on.
    if stats.spread < MIN_SPREAD {
        return RawPoseOutput::default();
    }

    let confidence = (0.5 + (stats.mean / 255.0) * 0.5).clamp(0.0, 1.0);
    if confidence < config.min_detection_confidence {
        return RawPoseOutput::default();
    }

    let mut landmarks = Vec::with_capacity(PoseLandmark::COUNT);
    for i in 0..PoseLandmark::COUNT {
        let t = i as f32 / (PoseLandmark::COUNT - 1) as f32;
        let sway = ((i * 37 % 21) as f32 / 20.0 - 0.5) * 0.1;
        landmarks.push(RawLandmark {
            x: (stats.centroid_x + sway).clamp(0.0, 1.0),
            y: (stats.centroid_y - 0.4 + 0.8 * t).clamp(0.0, 1.0),
            z: -(stats.mean / 255.0) * 0.1,
            visibility: VisibilityValue::Present(confidence),
        });
    }

    RawPoseOutput {
        poses: vec![RawPose { landmarks }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RunningMode;
    use tokio::sync::mpsc;

    fn gradient_image() -> NormalizedImage {
        let mut image = NormalizedImage::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                let v = (x * 16 + y * 4) as u8;
                image.set_pixel(x, y, [v, v, v, 255]);
            }
        }
        image
    }

    #[tokio::test]
    async fn test_gradient_image_yields_full_skeleton() {
        let factory = SyntheticPoseFactory::default();
        let model = factory
            .build(DetectorConfig::default(), None)
            .await
            .unwrap();

        let output = model.detect(&gradient_image()).await.unwrap();
        assert_eq!(output.poses.len(), 1);
        assert_eq!(output.poses[0].landmarks.len(), PoseLandmark::COUNT);
        for lm in &output.poses[0].landmarks {
            assert!((0.0..=1.0).contains(&lm.x));
            assert!((0.0..=1.0).contains(&lm.y));
            assert!(lm.visibility.resolve() >= 0.5);
        }
    }

    #[tokio::test]
    async fn test_detection_is_deterministic() {
        let factory = SyntheticPoseFactory::default();
        let model = factory
            .build(DetectorConfig::default(), None)
            .await
            .unwrap();

        let image = gradient_image();
        let first = model.detect(&image).await.unwrap();
        let second = model.detect(&image).await.unwrap();
        assert_eq!(first.poses[0].landmarks, second.poses[0].landmarks);
    }

    #[tokio::test]
    async fn test_blank_image_yields_no_poses() {
        let factory = SyntheticPoseFactory::default();
        let model = factory
            .build(DetectorConfig::default(), None)
            .await
            .unwrap();

        let blank = NormalizedImage::new(16, 16);
        let output = model.detect(&blank).await.unwrap();
        assert!(output.poses.is_empty());
    }

    #[tokio::test]
    async fn test_detection_threshold_is_honored() {
        let factory = SyntheticPoseFactory::default();
        let config = DetectorConfig {
            min_detection_confidence: 0.99,
            ..DetectorConfig::default()
        };
        let model = factory.build(config, None).await.unwrap();

        let output = model.detect(&gradient_image()).await.unwrap();
        assert!(output.poses.is_empty());
    }

    #[tokio::test]
    async fn test_gpu_delegate_rejected_unless_supported() {
        let factory = SyntheticPoseFactory::default();
        let config = DetectorConfig {
            delegate: ComputeDelegate::Gpu,
            ..DetectorConfig::default()
        };
        let err = factory.build(config, None).await.err().unwrap();
        assert_eq!(err.kind(), "configuration_error");
        assert_eq!(factory.open_instances(), 0);

        let gpu_factory = SyntheticPoseFactory::new(SyntheticConfig {
            supports_gpu: true,
            ..SyntheticConfig::default()
        });
        assert!(gpu_factory.build(config, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_decrements_accounting() {
        let factory = SyntheticPoseFactory::default();
        let mut model = factory
            .build(DetectorConfig::default(), None)
            .await
            .unwrap();
        assert_eq!(factory.open_instances(), 1);

        model.close().await.unwrap();
        assert_eq!(factory.open_instances(), 0);

        model.close().await.unwrap();
        assert_eq!(factory.open_instances(), 0);
        assert_eq!(factory.built_total(), 1);
    }

    #[tokio::test]
    async fn test_live_submission_delivers_on_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let factory = SyntheticPoseFactory::default();
        let config = DetectorConfig {
            running_mode: RunningMode::LiveStream,
            ..DetectorConfig::default()
        };
        let model = factory.build(config, Some(tx)).await.unwrap();

        model.detect_async(gradient_image(), 42).await.unwrap();

        let result = rx.recv().await.unwrap();
        assert_eq!(result.timestamp_ms, 42);
        let output = result.outcome.unwrap();
        assert_eq!(output.poses.len(), 1);
    }

    #[tokio::test]
    async fn test_live_submission_without_sink_fails() {
        let factory = SyntheticPoseFactory::default();
        let config = DetectorConfig {
            running_mode: RunningMode::LiveStream,
            ..DetectorConfig::default()
        };
        let model = factory.build(config, None).await.unwrap();

        let err = model.detect_async(gradient_image(), 1).await.err().unwrap();
        assert_eq!(err.kind(), "configuration_error");
    }

    #[tokio::test]
    async fn test_close_abandons_inflight_live_results() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let factory = SyntheticPoseFactory::new(SyntheticConfig {
            simulated_delay_ms: 200,
            ..SyntheticConfig::default()
        });
        let config = DetectorConfig {
            running_mode: RunningMode::LiveStream,
            ..DetectorConfig::default()
        };
        let mut model = factory.build(config, Some(tx)).await.unwrap();

        model.detect_async(gradient_image(), 7).await.unwrap();
        model.close().await.unwrap();
        drop(model);

        // The sender inside the abandoned task is dropped without sending.
        assert!(rx.recv().await.is_none());
    }
}
