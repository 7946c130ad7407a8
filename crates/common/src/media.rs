//! Representative-frame extraction from video files using FFmpeg.
//!
//! Video analysis operates on a single frame taken at the temporal midpoint
//! of the clip; scanning every frame is out of scope.

use crate::error::PoseError;
use std::process::{Command, Stdio};
use tracing::{debug, error, warn};

/// Probe a video's container duration in seconds using ffprobe.
///
/// Containers that report no parsable duration yield 0.0, which degrades
/// the midpoint to the first decodable frame.
pub fn probe_duration_seconds(source: &str) -> Result<f64, PoseError> {
    debug!(source = %source, "probing video duration");

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
            source,
        ])
        .output()
        .map_err(|e| PoseError::decode(format!("failed to execute ffprobe: {}", e)))?;

    if !output.status.success() {
        error!(source = %source, status = ?output.status, "ffprobe failed");
        return Err(PoseError::decode(format!(
            "ffprobe exited with error for '{}': {:?}",
            source, output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let duration = text.trim().parse::<f64>().unwrap_or_else(|_| {
        warn!(source = %source, raw = %text.trim(), "container reports no parsable duration");
        0.0
    });

    debug!(source = %source, duration_secs = duration, "probed duration");
    Ok(duration)
}

/// Temporal midpoint of a clip; unknown or degenerate durations map to 0.
pub fn midpoint_seconds(duration_secs: f64) -> f64 {
    if duration_secs.is_finite() && duration_secs > 0.0 {
        duration_secs / 2.0
    } else {
        0.0
    }
}

/// Extract a single PNG-encoded frame at `seconds` into the video.
pub fn extract_frame_at(source: &str, seconds: f64) -> Result<Vec<u8>, PoseError> {
    debug!(source = %source, seek_secs = seconds, "extracting frame from video");

    let seek = format!("{:.3}", seconds);
    let args = [
        "-ss",
        seek.as_str(),
        "-i",
        source,
        "-vframes",
        "1",
        "-f",
        "image2pipe",
        "-vcodec",
        "png",
        "pipe:1",
    ];

    let output = Command::new("ffmpeg")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map_err(|e| PoseError::decode(format!("failed to execute ffmpeg: {}", e)))?;

    if !output.status.success() {
        error!(
            source = %source,
            status = ?output.status,
            "ffmpeg frame extraction failed"
        );
        return Err(PoseError::decode(format!(
            "ffmpeg exited with error for '{}': {:?}",
            source, output.status
        )));
    }

    if output.stdout.is_empty() {
        warn!(source = %source, "ffmpeg returned empty frame data");
        return Err(PoseError::decode(format!(
            "no frame data decoded from '{}'",
            source
        )));
    }

    debug!(
        source = %source,
        size_bytes = output.stdout.len(),
        "frame extracted"
    );

    Ok(output.stdout)
}

/// Extract the representative frame at the temporal midpoint of a video.
pub fn extract_midpoint_frame(source: &str) -> Result<Vec<u8>, PoseError> {
    let duration = probe_duration_seconds(source)?;
    extract_frame_at(source, midpoint_seconds(duration))
}
