//! The central **abstraction** for discovery sweeps.
//!
//! A sweep is a pipeline: the [`sweep`] scheduler fans probes out over every
//! host and endpoint, each [`ProbeOutcome`] is judged by the [`classifier`],
//! and the [`resolver`] collapses the qualifying hits into a device list with
//! one selected device.
//!
//! **Architectural Note:**
//! The scheduler only knows the [`Prober`] trait. Real sweeps use the HTTP
//! implementation in [`crate::network::http`]; tests plug in scripted probers.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use async_trait::async_trait;
use motorlink_common::device::{Endpoint, ResponseBody};

pub mod classifier;
pub mod resolver;
pub mod sweep;

/// Issues exactly one request to a (host, endpoint) pair.
///
/// Implementations never retry and never return an error: every failure is
/// folded into [`ProbeResult::Failed`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: Ipv4Addr, endpoint: &Endpoint) -> ProbeOutcome;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedResponse {
    pub status: u16,
    /// Header names are lower-case.
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl ObservedResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Timeout,
    Connect,
    Transport(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Observed(ObservedResponse),
    Failed(ProbeFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub host: Ipv4Addr,
    pub endpoint: Endpoint,
    pub result: ProbeResult,
}

impl ProbeOutcome {
    pub fn observed(host: Ipv4Addr, endpoint: Endpoint, response: ObservedResponse) -> Self {
        Self {
            host,
            endpoint,
            result: ProbeResult::Observed(response),
        }
    }

    pub fn failed(host: Ipv4Addr, endpoint: Endpoint, failure: ProbeFailure) -> Self {
        Self {
            host,
            endpoint,
            result: ProbeResult::Failed(failure),
        }
    }
}
