use thiserror::Error;

/// Error taxonomy surfaced to callers of the pose pipeline.
///
/// Every failure is reported to the originating caller with a
/// human-readable message; no category is retried automatically.
#[derive(Debug, Error)]
pub enum PoseError {
    /// Invalid detector options, including a missing or superfluous
    /// live-result target. Fatal to the construction attempt, not to the
    /// process.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable or undecodable image, video, or camera frame.
    #[error("decode error: {0}")]
    Decode(String),

    /// The model failed to produce output. The detector remains usable for
    /// subsequent calls.
    #[error("detection error: {0}")]
    Detection(String),

    /// Pixel-conversion or I/O failure not covered by the other kinds.
    #[error("processing error: {0}")]
    Processing(String),

    /// A request arrived while its category slot was still occupied.
    /// Surfaces on the wire as a processing error; callers must wait for
    /// the outstanding request to resolve.
    #[error("another {0} request is already in flight")]
    Busy(&'static str),
}

impl PoseError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection(msg.into())
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    /// Stable machine-readable tag used in wire payloads and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::Decode(_) => "decode_error",
            Self::Detection(_) => "detection_error",
            Self::Processing(_) | Self::Busy(_) => "processing_error",
        }
    }
}
