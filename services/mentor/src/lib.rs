pub mod capture;
pub mod config;
pub mod playback;
pub mod session;
pub mod transcript;

pub use mentor_realtime::types as live_types;
