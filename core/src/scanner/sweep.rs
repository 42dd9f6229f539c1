//! The **sweep scheduler**.
//!
//! Fans one probe task out per (host, endpoint) pair, gated by a semaphore so
//! that at most `max_in_flight` requests are outstanding. Each task races its
//! probe against the task timeout once it holds a permit; losing the race drops
//! the probe future, which tears down the in-flight request.
//!
//! The sweep never exits early. Hits are returned in completion order.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use motorlink_common::config::ScanConfig;
use motorlink_common::device::Endpoint;
use motorlink_common::network::range::Subnet24;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::classifier::Classifier;
use super::{ObservedResponse, ProbeResult, Prober};

/// A qualifying probe outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub host: Ipv4Addr,
    pub endpoint: Endpoint,
    pub response: ObservedResponse,
}

/// Invoked with the running hit count every time a probe qualifies.
pub type HitCallback = Arc<dyn Fn(usize) + Send + Sync>;

pub struct SweepScheduler {
    prober: Arc<dyn Prober>,
    classifier: Arc<Classifier>,
    endpoints: Vec<Endpoint>,
    task_timeout: Duration,
    max_in_flight: usize,
    on_hit: Option<HitCallback>,
}

impl SweepScheduler {
    pub fn new(prober: Arc<dyn Prober>, cfg: &ScanConfig) -> Self {
        Self {
            prober,
            classifier: Arc::new(Classifier::from_config(cfg)),
            endpoints: cfg.endpoints.clone(),
            task_timeout: cfg.task_timeout,
            max_in_flight: cfg.max_in_flight.max(1),
            on_hit: None,
        }
    }

    pub fn with_progress(mut self, on_hit: HitCallback) -> Self {
        self.on_hit = Some(on_hit);
        self
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Sweeps hosts `.1` through `.254` of the subnet.
    pub async fn run(&self, subnet: Subnet24) -> Vec<Hit> {
        self.run_hosts(subnet.hosts().to_iter()).await
    }

    pub async fn run_hosts<I>(&self, hosts: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = Ipv4Addr>,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks: JoinSet<Option<Hit>> = JoinSet::new();

        for host in hosts {
            for endpoint in &self.endpoints {
                tasks.spawn(probe_task(
                    Arc::clone(&self.prober),
                    Arc::clone(&self.classifier),
                    Arc::clone(&semaphore),
                    host,
                    endpoint.clone(),
                    self.task_timeout,
                ));
            }
        }

        debug!(
            tasks = tasks.len(),
            max_in_flight = self.max_in_flight,
            "sweep started"
        );

        let hit_count = AtomicUsize::new(0);
        let mut hits: Vec<Hit> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(hit)) => {
                    debug!(host = %hit.host, endpoint = %hit.endpoint, "probe qualified");
                    let count = hit_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(cb) = &self.on_hit {
                        cb(count);
                    }
                    hits.push(hit);
                }
                Ok(None) => {}
                Err(e) => warn!("probe task aborted: {e}"),
            }
        }

        hits
    }
}

async fn probe_task(
    prober: Arc<dyn Prober>,
    classifier: Arc<Classifier>,
    semaphore: Arc<Semaphore>,
    host: Ipv4Addr,
    endpoint: Endpoint,
    task_timeout: Duration,
) -> Option<Hit> {
    let _permit = semaphore.acquire_owned().await.ok()?;

    let outcome = match timeout(task_timeout, prober.probe(host, &endpoint)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            trace!(%host, %endpoint, "probe task timed out");
            return None;
        }
    };

    if !classifier.classify(&outcome) {
        return None;
    }

    match outcome.result {
        ProbeResult::Observed(response) => Some(Hit {
            host,
            endpoint,
            response,
        }),
        ProbeResult::Failed(_) => None,
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
