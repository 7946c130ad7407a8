//! Shared service state and the request orchestration paths.

use crate::backend::{DetectorConfig, LiveResult, PoseModelFactory, RunningMode};
use crate::dispatch;
use crate::lifecycle::{DetectorManager, ManagerState};
use crate::results;
use crate::session::{PendingOutcome, PendingTable, RequestCategory};
use common::convert::{self, ConversionOutcome};
use common::error::PoseError;
use common::frame::{NormalizedImage, RawFrame};
use common::landmark::DetectionResult;
use common::{media, transform};
use std::sync::Arc;
use telemetry::metrics::{
    POSE_CONVERSION_SKIPPED_PIXELS, POSE_FRAMES_CONVERTED, POSE_INFERENCE_LATENCY,
    POSE_LIVE_RESULTS_DROPPED, POSE_REQUESTS,
};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared state for the pose service.
#[derive(Clone)]
pub struct PoseServiceState {
    inner: Arc<PoseServiceStateInner>,
}

struct PoseServiceStateInner {
    node_id: String,
    /// Detector options used until a caller reconfigures the detector.
    base_config: DetectorConfig,
    manager: Mutex<DetectorManager>,
    pending: PendingTable,
    live_sink: mpsc::UnboundedSender<LiveResult>,
    shutdown: CancellationToken,
}

impl PoseServiceState {
    /// Create the service state and spawn the live-result resolver.
    pub fn new(node_id: String, factory: Arc<dyn PoseModelFactory>) -> Self {
        Self::with_base_config(node_id, factory, DetectorConfig::default())
    }

    /// Create the service state with configured detector defaults.
    pub fn with_base_config(
        node_id: String,
        factory: Arc<dyn PoseModelFactory>,
        base_config: DetectorConfig,
    ) -> Self {
        let (live_sink, live_results) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let state = Self {
            inner: Arc::new(PoseServiceStateInner {
                node_id,
                base_config,
                manager: Mutex::new(DetectorManager::new(factory)),
                pending: PendingTable::new(),
                live_sink,
                shutdown: shutdown.clone(),
            }),
        };
        state.spawn_live_resolver(live_results, shutdown);
        state
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    /// Analyze a still image from disk. Suspends until the result is
    /// available.
    pub async fn process_image(&self, image_path: &str) -> Result<DetectionResult, PoseError> {
        let image = Self::load_image(image_path).await;
        let outcome = self
            .run_blocking_detection(RequestCategory::Image, RunningMode::Image, image)
            .await;
        self.observe_request(RequestCategory::Image, &outcome);
        outcome
    }

    /// Analyze the midpoint frame of a video file.
    pub async fn process_video(&self, video_path: &str) -> Result<DetectionResult, PoseError> {
        let image = Self::load_video_midpoint(video_path).await;
        let outcome = self
            .run_blocking_detection(RequestCategory::Video, RunningMode::Video, image)
            .await;
        self.observe_request(RequestCategory::Video, &outcome);
        outcome
    }

    /// Analyze one live camera frame: convert, orient, submit to the live
    /// detector, and await the asynchronously delivered result.
    pub async fn process_camera_frame(
        &self,
        frame: RawFrame,
        mirror: bool,
        rotation_degrees: f32,
    ) -> Result<DetectionResult, PoseError> {
        let outcome = self.run_live_detection(frame, mirror, rotation_degrees).await;
        self.observe_request(RequestCategory::LiveCamera, &outcome);
        outcome
    }

    /// Current lifecycle state and options of the detector.
    pub async fn detector_status(&self) -> (ManagerState, Option<DetectorConfig>) {
        let manager = self.inner.manager.lock().await;
        (manager.state(), manager.config().copied())
    }

    /// Apply a full detector configuration. The current instance is always
    /// released first; a pending live request is failed before teardown.
    pub async fn configure_detector(
        &self,
        config: DetectorConfig,
    ) -> Result<(ManagerState, Option<DetectorConfig>), PoseError> {
        let mut manager = self.inner.manager.lock().await;
        self.abort_live_pending(&manager, "detector reconfigured").await;

        let sink = config
            .running_mode
            .is_live()
            .then(|| self.inner.live_sink.clone());
        manager.configure(config, sink).await?;
        Ok((manager.state(), manager.config().copied()))
    }

    /// Release the detector. Releasing twice is a no-op.
    pub async fn release_detector(&self) -> Result<ManagerState, PoseError> {
        let mut manager = self.inner.manager.lock().await;
        self.abort_live_pending(&manager, "detector released").await;
        manager.release().await?;
        Ok(manager.state())
    }

    /// Fail all pending requests, release the detector, and stop the
    /// resolver.
    pub async fn shutdown(&self) -> Result<(), PoseError> {
        info!("shutting down pose service...");
        self.inner.shutdown.cancel();

        for category in [
            RequestCategory::Image,
            RequestCategory::Video,
            RequestCategory::LiveCamera,
        ] {
            let failed = self
                .inner
                .pending
                .resolve(category, Err(PoseError::processing("service shutting down")))
                .await;
            if failed {
                warn!(
                    category = category.as_str(),
                    "failed pending request during shutdown"
                );
            }
        }

        let mut manager = self.inner.manager.lock().await;
        manager.release().await?;
        info!("pose service shutdown complete");
        Ok(())
    }

    fn spawn_live_resolver(
        &self,
        mut results: mpsc::UnboundedReceiver<LiveResult>,
        shutdown: CancellationToken,
    ) {
        let state = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("live result resolver stopped");
                        break;
                    }
                    received = results.recv() => {
                        match received {
                            Some(result) => state.resolve_live_result(result).await,
                            None => break,
                        }
                    }
                }
            }
        });
    }

    /// Pair an asynchronously delivered live result with the pending
    /// live-camera handle. Results with no waiting handle are dropped.
    async fn resolve_live_result(&self, result: LiveResult) {
        let Some(entry) = self.inner.pending.take(RequestCategory::LiveCamera).await else {
            POSE_LIVE_RESULTS_DROPPED.inc();
            warn!(
                timestamp_ms = result.timestamp_ms,
                "dropping live result with no pending handle"
            );
            return;
        };

        let elapsed_ms = entry.submitted_at.elapsed().as_millis() as u64;
        let frame_width = entry.frame_width;
        let frame_height = entry.frame_height;

        let outcome = result.outcome.map(|raw| {
            POSE_INFERENCE_LATENCY
                .with_label_values(&[RunningMode::LiveStream.as_str()])
                .observe(elapsed_ms as f64 / 1000.0);
            results::normalize_output(raw, elapsed_ms, frame_width, frame_height)
        });

        if !entry.deliver(outcome) {
            POSE_LIVE_RESULTS_DROPPED.inc();
            warn!(
                timestamp_ms = result.timestamp_ms,
                "live result arrived after the caller stopped waiting"
            );
        }
    }

    async fn run_blocking_detection(
        &self,
        category: RequestCategory,
        mode: RunningMode,
        image: Result<NormalizedImage, PoseError>,
    ) -> Result<DetectionResult, PoseError> {
        let image = image?;
        let receiver = self
            .inner
            .pending
            .claim(category, image.width, image.height)
            .await?;

        let detection = {
            let mut manager = self.inner.manager.lock().await;
            let config = self.config_for(&manager, mode);
            self.abort_live_pending_if_rebuilding(&manager, &config, "detector reconfigured")
                .await;

            match manager.ensure(config, None).await {
                Ok(()) => match manager.detector() {
                    Ok(model) => dispatch::detect_blocking(model, &image).await,
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            }
        };

        let outcome = detection
            .map(|(raw, elapsed_ms)| {
                results::normalize_output(raw, elapsed_ms, image.width, image.height)
            });
        self.inner.pending.resolve(category, outcome).await;

        await_pending(receiver).await
    }

    async fn run_live_detection(
        &self,
        frame: RawFrame,
        mirror: bool,
        rotation_degrees: f32,
    ) -> Result<DetectionResult, PoseError> {
        let timestamp_ms = frame.timestamp_ms;
        let converted = convert::normalize_frame(&frame)?;
        self.observe_conversion(&converted);
        let image = transform::normalize_orientation(converted.image, mirror, rotation_degrees);

        let receiver = {
            let mut manager = self.inner.manager.lock().await;
            let config = self.config_for(&manager, RunningMode::LiveStream);
            manager
                .ensure(config, Some(self.inner.live_sink.clone()))
                .await?;

            let receiver = self
                .inner
                .pending
                .claim(RequestCategory::LiveCamera, image.width, image.height)
                .await?;

            let submitted = match manager.detector() {
                Ok(model) => dispatch::submit_live(model, image, timestamp_ms).await,
                Err(e) => Err(e),
            };
            if let Err(e) = submitted {
                self.inner
                    .pending
                    .resolve(RequestCategory::LiveCamera, Err(e))
                    .await;
            }
            receiver
        };

        await_pending(receiver).await
    }

    /// Fail the pending live request before its detector is torn down.
    async fn abort_live_pending(&self, manager: &DetectorManager, reason: &'static str) {
        let live = manager
            .config()
            .map(|c| c.running_mode.is_live())
            .unwrap_or(false);
        if !live {
            return;
        }

        let resolved = self
            .inner
            .pending
            .resolve(RequestCategory::LiveCamera, Err(PoseError::processing(reason)))
            .await;
        if resolved {
            info!(reason, "failed pending live request before detector teardown");
        }
    }

    async fn abort_live_pending_if_rebuilding(
        &self,
        manager: &DetectorManager,
        next: &DetectorConfig,
        reason: &'static str,
    ) {
        if manager.requires_rebuild(next) {
            self.abort_live_pending(manager, reason).await;
        }
    }

    /// Carry the current detector options forward, overriding only the
    /// mode. Falls back to the configured defaults before the first build.
    fn config_for(&self, manager: &DetectorManager, mode: RunningMode) -> DetectorConfig {
        let mut config = manager
            .config()
            .copied()
            .unwrap_or(self.inner.base_config);
        config.running_mode = mode;
        config
    }

    fn observe_conversion(&self, outcome: &ConversionOutcome) {
        POSE_FRAMES_CONVERTED
            .with_label_values(&[outcome.path.as_str()])
            .inc();
        if outcome.skipped_pixels > 0 {
            POSE_CONVERSION_SKIPPED_PIXELS.inc_by(outcome.skipped_pixels);
            debug!(
                skipped = outcome.skipped_pixels,
                path = outcome.path.as_str(),
                "conversion skipped out-of-bounds pixels"
            );
        }
    }

    fn observe_request(&self, category: RequestCategory, outcome: &Result<DetectionResult, PoseError>) {
        let status = match outcome {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        POSE_REQUESTS
            .with_label_values(&[category.as_str(), status])
            .inc();
    }

    async fn load_image(path: &str) -> Result<NormalizedImage, PoseError> {
        let owned = path.to_string();
        let decoded = tokio::task::spawn_blocking(move || image::open(&owned).map(|i| i.to_rgba8()))
            .await
            .map_err(|e| PoseError::processing(format!("image decode task failed: {}", e)))?;

        let rgba = decoded
            .map_err(|e| PoseError::decode(format!("failed to decode image '{}': {}", path, e)))?;
        let (width, height) = rgba.dimensions();
        NormalizedImage::from_rgba(width, height, rgba.into_raw())
    }

    async fn load_video_midpoint(path: &str) -> Result<NormalizedImage, PoseError> {
        let owned = path.to_string();
        let bytes = tokio::task::spawn_blocking(move || media::extract_midpoint_frame(&owned))
            .await
            .map_err(|e| PoseError::processing(format!("frame extraction task failed: {}", e)))??;

        let rgba = image::load_from_memory(&bytes)
            .map_err(|e| PoseError::decode(format!("failed to decode extracted frame: {}", e)))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        NormalizedImage::from_rgba(width, height, rgba.into_raw())
    }
}

async fn await_pending(
    receiver: oneshot::Receiver<PendingOutcome>,
) -> Result<DetectionResult, PoseError> {
    match receiver.await {
        Ok(outcome) => outcome,
        Err(_) => Err(PoseError::processing("result channel closed before delivery")),
    }
}
