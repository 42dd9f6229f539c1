//! Loopback fixtures for end-to-end discovery tests.
//!
//! Linux routes all of 127.0.0.0/8 to `lo`, so every host of the
//! 127.0.0.0/24 sweep can be given its own listener.

pub mod utils;

#[cfg(test)]
mod discovery;

#[cfg(test)]
mod upload;
