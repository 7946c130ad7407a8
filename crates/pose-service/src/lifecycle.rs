//! Detector ownership and the build/release state machine.

use crate::backend::{DetectorConfig, LiveResultSink, PoseModel, PoseModelFactory};
use common::error::PoseError;
use serde::Serialize;
use std::sync::Arc;
use telemetry::metrics::{POSE_ACTIVE_DETECTORS, POSE_DETECTOR_BUILDS, POSE_DETECTOR_RELEASES};
use tracing::{info, warn};

/// Lifecycle states of the detector manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    /// No detector has been built yet.
    Uninitialized,
    /// A detector is live and accepting work.
    Ready,
    /// The detector was released or its build failed.
    Closed,
}

impl ManagerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

/// Owns the single detector instance and serializes its reconfiguration.
///
/// Mode or option changes always release the current detector before a new
/// one is built; a live detector's options are never mutated in place. At
/// most one detector exists at any time.
pub struct DetectorManager {
    factory: Arc<dyn PoseModelFactory>,
    detector: Option<Box<dyn PoseModel>>,
    state: ManagerState,
}

impl DetectorManager {
    pub fn new(factory: Arc<dyn PoseModelFactory>) -> Self {
        Self {
            factory,
            detector: None,
            state: ManagerState::Uninitialized,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Options of the current detector, if one is live.
    pub fn config(&self) -> Option<&DetectorConfig> {
        self.detector.as_ref().map(|d| d.config())
    }

    /// Whether [`Self::ensure`] would tear down and rebuild for `config`.
    pub fn requires_rebuild(&self, config: &DetectorConfig) -> bool {
        match (&self.detector, self.state) {
            (Some(current), ManagerState::Ready) => current.config() != config,
            _ => true,
        }
    }

    /// The current detector, if the manager is ready.
    pub fn detector(&self) -> Result<&dyn PoseModel, PoseError> {
        match &self.detector {
            Some(detector) => Ok(detector.as_ref()),
            None => Err(PoseError::processing(format!(
                "no detector available (state: {})",
                self.state.as_str()
            ))),
        }
    }

    /// Make sure a detector built with `config` is live, reusing the
    /// current instance when its options already match.
    pub async fn ensure(
        &mut self,
        config: DetectorConfig,
        sink: Option<LiveResultSink>,
    ) -> Result<(), PoseError> {
        if !self.requires_rebuild(&config) {
            return Ok(());
        }
        self.configure(config, sink).await
    }

    /// Release the current detector (if any) and build a new one.
    ///
    /// A failed build leaves the manager closed; nothing is retried.
    pub async fn configure(
        &mut self,
        config: DetectorConfig,
        sink: Option<LiveResultSink>,
    ) -> Result<(), PoseError> {
        config.validate()?;
        if config.running_mode.is_live() && sink.is_none() {
            return Err(PoseError::configuration(
                "live_stream mode requires a result sink",
            ));
        }
        if !config.running_mode.is_live() && sink.is_some() {
            return Err(PoseError::configuration(format!(
                "{} mode must not carry a result sink",
                config.running_mode.as_str()
            )));
        }

        self.release().await?;

        match self.factory.build(config, sink).await {
            Ok(detector) => {
                self.detector = Some(detector);
                self.state = ManagerState::Ready;
                POSE_ACTIVE_DETECTORS.inc();
                POSE_DETECTOR_BUILDS.with_label_values(&["ok"]).inc();
                info!(
                    mode = config.running_mode.as_str(),
                    variant = ?config.model_variant,
                    delegate = ?config.delegate,
                    "detector ready"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ManagerState::Closed;
                POSE_DETECTOR_BUILDS.with_label_values(&["error"]).inc();
                warn!(error = %e, "detector build failed");
                Err(e)
            }
        }
    }

    /// Release the current detector. Idempotent: releasing when nothing is
    /// live is a no-op.
    pub async fn release(&mut self) -> Result<(), PoseError> {
        if let Some(mut detector) = self.detector.take() {
            if let Err(e) = detector.close().await {
                // The instance is discarded either way.
                warn!(error = %e, "detector close reported an error");
            }
            POSE_ACTIVE_DETECTORS.dec();
            POSE_DETECTOR_RELEASES.inc();
            info!("detector released");
        }
        self.state = ManagerState::Closed;
        Ok(())
    }
}
