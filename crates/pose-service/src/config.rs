use crate::backend::{ComputeDelegate, DetectorConfig, ModelVariant};
use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct PoseServiceConfig {
    /// Address to bind the HTTP server to
    pub bind_addr: String,

    /// Node ID for this pose service instance
    pub node_id: String,

    /// Detector options applied until a caller reconfigures the detector
    pub detector: DetectorConfig,

    /// Simulated inference delay for the synthetic backend (milliseconds)
    pub synthetic_delay_ms: u64,
}

impl PoseServiceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr =
            env::var("POSE_SERVICE_ADDR").unwrap_or_else(|_| "0.0.0.0:8086".to_string());

        let model_variant = match env::var("POSE_MODEL_VARIANT").ok().as_deref() {
            None | Some("full") => ModelVariant::Full,
            Some("lite") => ModelVariant::Lite,
            Some("heavy") => ModelVariant::Heavy,
            Some(other) => bail!("Invalid POSE_MODEL_VARIANT: {}", other),
        };

        let delegate = match env::var("POSE_DELEGATE").ok().as_deref() {
            None | Some("cpu") => ComputeDelegate::Cpu,
            Some("gpu") => ComputeDelegate::Gpu,
            Some(other) => bail!("Invalid POSE_DELEGATE: {}", other),
        };

        let detector = DetectorConfig {
            model_variant,
            delegate,
            min_detection_confidence: confidence_from_env("POSE_MIN_DETECTION_CONFIDENCE")?,
            min_tracking_confidence: confidence_from_env("POSE_MIN_TRACKING_CONFIDENCE")?,
            min_presence_confidence: confidence_from_env("POSE_MIN_PRESENCE_CONFIDENCE")?,
            ..DetectorConfig::default()
        };

        let synthetic_delay_ms = env::var("POSE_SYNTHETIC_DELAY_MS")
            .ok()
            .map(|value| {
                value
                    .parse::<u64>()
                    .context("Invalid POSE_SYNTHETIC_DELAY_MS")
            })
            .transpose()?
            .unwrap_or(0);

        let node_id = env::var("NODE_ID").unwrap_or_else(|_| {
            format!(
                "pose-service-{}",
                hostname::get()
                    .ok()
                    .and_then(|h| h.into_string().ok())
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
            )
        });

        Ok(Self {
            bind_addr,
            node_id,
            detector,
            synthetic_delay_ms,
        })
    }
}

fn confidence_from_env(var: &str) -> Result<f32> {
    let Some(value) = env::var(var).ok() else {
        return Ok(0.5);
    };
    let parsed = value
        .parse::<f32>()
        .with_context(|| format!("Invalid {}", var))?;
    if !(0.0..=1.0).contains(&parsed) {
        bail!("{} must be within [0, 1], got {}", var, parsed);
    }
    Ok(parsed)
}
