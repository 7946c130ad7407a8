pub mod convert;
pub mod error;
pub mod frame;
pub mod landmark;
pub mod media;
pub mod transform;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
