//! Logging macros used across the workspace.
//!
//! They forward to `tracing` so the CLI formatter decides how each level is
//! rendered. `success!` is an INFO event on its own target, which the
//! formatter highlights.

pub const SUCCESS_TARGET: &str = "motorlink::success";
pub const PRINT_TARGET: &str = "motorlink::print";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "motorlink::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::tracing::error!($($arg)*)
    };
}
