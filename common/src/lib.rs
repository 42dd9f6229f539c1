//! # Motorlink Common
//!
//! Types shared by every crate in the workspace: the configuration model,
//! the device records produced by discovery, network range detection and
//! the logging macros.

pub mod config;
pub mod device;
pub mod log;
pub mod network;
pub mod utils;

pub use tracing;
