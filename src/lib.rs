//! Umbrella crate re-exporting the posekit workspace members.

pub use common;
pub use pose_service;
pub use telemetry;
