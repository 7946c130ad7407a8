//! Pose estimation service: camera-frame normalization, detector
//! lifecycle management, and inference dispatch behind an HTTP API.

pub mod api;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod lifecycle;
pub mod results;
pub mod session;
pub mod state;

pub use config::PoseServiceConfig;
pub use state::PoseServiceState;
