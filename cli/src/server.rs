//! # Dashboard Server
//!
//! HTTP API and WebSocket event stream around one discovery session.

pub mod error;
pub mod hub;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, LinkStatus};
