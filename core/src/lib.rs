//! # Motorlink Core
//!
//! The discovery engine and the collaborators that act on its result.
//!
//! * **[`scanner`]**: probing, classification, the sweep scheduler and the
//!   deduplicating resolver.
//! * **[`network`]**: the HTTP prober used against real hosts.
//! * **[`discovery`]**: the session that owns the last completed snapshot.
//! * **[`relay`]**: command delivery and connection tests against the
//!   selected device.
//! * **[`upload`]**: sketch compilation and upload through `arduino-cli`.

pub mod discovery;
pub mod network;
pub mod relay;
pub mod scanner;
pub mod upload;
