//! # Discovery Session
//!
//! Owns the result of the last completed sweep.
//!
//! The session is constructed once at process start and shared by reference
//! with every collaborator. Readers always see a whole [`Snapshot`]: a
//! completed scan swaps in a new one, it never edits the current one.
//!
//! Scans are single-flight. A caller that arrives while a scan is running
//! waits for it and receives its snapshot instead of starting another sweep.

use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use motorlink_common::config::ScanConfig;
use motorlink_common::device::DiscoveredDevice;
use motorlink_common::network::range::Subnet24;
use motorlink_common::network::target::Target;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::network::http::HttpProber;
use crate::scanner::Prober;
use crate::scanner::resolver::{self, Resolution};
use crate::scanner::sweep::{HitCallback, SweepScheduler};

/// An immutable view of one completed scan.
///
/// Generation `0` is the empty snapshot that exists before the first scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    generation: u64,
    subnet: Option<Subnet24>,
    completed_at: Option<DateTime<Utc>>,
    resolution: Resolution,
}

impl Snapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subnet(&self) -> Option<Subnet24> {
        self.subnet
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.resolution.devices
    }

    /// Always an element of [`Snapshot::devices`].
    pub fn selected(&self) -> Option<&DiscoveredDevice> {
        self.resolution.selected()
    }

    pub fn is_empty(&self) -> bool {
        self.resolution.devices.is_empty()
    }
}

pub struct DiscoverySession {
    current: RwLock<Arc<Snapshot>>,
    scan_lock: Mutex<()>,
    scheduler: SweepScheduler,
    target: Target,
}

impl DiscoverySession {
    /// Builds a session that probes real hosts over HTTP.
    pub fn new(cfg: &ScanConfig) -> anyhow::Result<Self> {
        let prober = HttpProber::new(cfg)?;
        Ok(Self::with_prober(Arc::new(prober), cfg))
    }

    pub fn with_prober(prober: Arc<dyn Prober>, cfg: &ScanConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::default())),
            scan_lock: Mutex::new(()),
            scheduler: SweepScheduler::new(prober, cfg),
            target: cfg.target,
        }
    }

    pub fn with_progress(mut self, on_hit: HitCallback) -> Self {
        self.scheduler = self.scheduler.with_progress(on_hit);
        self
    }

    /// The last completed snapshot. Does not wait for a running scan.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// Address of the auto-detected device, read at call time.
    pub async fn selected_ip(&self) -> Option<Ipv4Addr> {
        self.snapshot().await.selected().map(|device| device.ip)
    }

    /// Runs a full sweep and publishes its result.
    ///
    /// Never fails: probe errors mean "no device" and an undetectable
    /// interface falls back to the default range.
    pub async fn scan(&self) -> Arc<Snapshot> {
        let observed = self.current.read().await.generation;
        let _guard = self.scan_lock.lock().await;

        let latest = self.snapshot().await;
        if latest.generation != observed {
            debug!(
                generation = latest.generation,
                "scan finished while waiting, sharing its result"
            );
            return latest;
        }

        let subnet = self.target.resolve();
        info!(%subnet, "sweeping for motor controllers");

        let hits = self.scheduler.run(subnet).await;
        let resolution = resolver::resolve(hits);

        let next = Arc::new(Snapshot {
            generation: latest.generation + 1,
            subnet: Some(subnet),
            completed_at: Some(Utc::now()),
            resolution,
        });

        match next.selected() {
            Some(device) => info!(
                devices = next.devices().len(),
                selected = %device.ip,
                "scan complete"
            ),
            None => info!("scan complete, no devices found"),
        }

        *self.current.write().await = Arc::clone(&next);
        next
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{ObservedResponse, ProbeFailure, ProbeOutcome};
    use async_trait::async_trait;
    use motorlink_common::device::{Endpoint, ResponseBody};
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const SUBNET: Subnet24 = Subnet24::new([10, 0, 0]);

    /// Hosts listed in `responders` answer `/status` with a status payload.
    struct Responders {
        responders: std::sync::Mutex<Vec<u8>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Responders {
        fn new(octets: &[u8], delay: Duration) -> Self {
            Self {
                responders: std::sync::Mutex::new(octets.to_vec()),
                delay,
                calls: AtomicUsize::new(0),
            }
        }

        fn set(&self, octets: &[u8]) {
            *self.responders.lock().unwrap() = octets.to_vec();
        }
    }

    #[async_trait]
    impl Prober for Responders {
        async fn probe(&self, host: Ipv4Addr, endpoint: &Endpoint) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answers = endpoint.path == "/status"
                && self.responders.lock().unwrap().contains(&host.octets()[3]);

            if !answers {
                return ProbeOutcome::failed(host, endpoint.clone(), ProbeFailure::Connect);
            }

            tokio::time::sleep(self.delay).await;
            ProbeOutcome::observed(
                host,
                endpoint.clone(),
                ObservedResponse {
                    status: 200,
                    headers: BTreeMap::new(),
                    body: ResponseBody::parse(r#"{"status":"ok","armed":false}"#.to_string()),
                },
            )
        }
    }

    fn config() -> ScanConfig {
        ScanConfig {
            target: Target::Subnet { subnet: SUBNET },
            task_timeout: Duration::from_millis(500),
            ..ScanConfig::default()
        }
    }

    fn session(prober: Arc<Responders>) -> DiscoverySession {
        DiscoverySession::with_prober(prober, &config())
    }

    fn assert_invariants(snapshot: &Snapshot) {
        let ips: HashSet<Ipv4Addr> = snapshot.devices().iter().map(|d| d.ip).collect();
        assert_eq!(ips.len(), snapshot.devices().len(), "duplicate host in devices");
        match snapshot.selected() {
            Some(selected) => assert_eq!(selected, &snapshot.devices()[0]),
            None => assert!(snapshot.is_empty()),
        }
    }

    #[tokio::test]
    async fn fresh_session_has_empty_snapshot() {
        let session = session(Arc::new(Responders::new(&[], Duration::ZERO)));
        let snapshot = session.snapshot().await;

        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.is_empty());
        assert!(snapshot.completed_at().is_none());
        assert_eq!(session.selected_ip().await, None);
    }

    #[tokio::test]
    async fn scan_publishes_single_responder() {
        let session = session(Arc::new(Responders::new(&[42], Duration::ZERO)));

        let snapshot = session.scan().await;

        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.subnet(), Some(SUBNET));
        assert_eq!(snapshot.devices().len(), 1);
        assert_eq!(snapshot.devices()[0].endpoint, "/status");
        assert_eq!(session.selected_ip().await, Some(Ipv4Addr::new(10, 0, 0, 42)));
        assert_invariants(&snapshot);
    }

    #[tokio::test]
    async fn empty_network_is_a_normal_result() {
        let session = session(Arc::new(Responders::new(&[], Duration::ZERO)));

        let snapshot = session.scan().await;

        assert_eq!(snapshot.generation(), 1);
        assert!(snapshot.is_empty());
        assert!(snapshot.selected().is_none());
        assert!(snapshot.completed_at().is_some());
    }

    #[tokio::test]
    async fn two_responders_keep_the_invariant() {
        let session = session(Arc::new(Responders::new(&[5, 9], Duration::ZERO)));

        let snapshot = session.scan().await;

        let ips: HashSet<u8> = snapshot.devices().iter().map(|d| d.ip.octets()[3]).collect();
        assert_eq!(ips, HashSet::from([5, 9]));
        assert_invariants(&snapshot);
    }

    #[tokio::test]
    async fn consecutive_scans_agree_as_sets() {
        let session = session(Arc::new(Responders::new(&[5, 9, 200], Duration::ZERO)));

        let first: HashSet<Ipv4Addr> = session.scan().await.devices().iter().map(|d| d.ip).collect();
        let second: HashSet<Ipv4Addr> = session.scan().await.devices().iter().map(|d| d.ip).collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn overlapping_scans_share_one_sweep() {
        let prober = Arc::new(Responders::new(&[42], Duration::from_millis(100)));
        let session = session(prober.clone());

        let (a, b) = tokio::join!(session.scan(), session.scan());

        assert_eq!(a.generation(), 1);
        assert_eq!(b.generation(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(prober.calls.load(Ordering::SeqCst), 254 * 4);
    }

    #[tokio::test]
    async fn new_scan_replaces_previous_selection() {
        let prober = Arc::new(Responders::new(&[42], Duration::ZERO));
        let session = session(prober.clone());

        session.scan().await;
        assert_eq!(session.selected_ip().await, Some(Ipv4Addr::new(10, 0, 0, 42)));

        prober.set(&[]);
        let snapshot = session.scan().await;

        assert_eq!(snapshot.generation(), 2);
        assert!(snapshot.is_empty());
        assert_eq!(session.selected_ip().await, None);
    }

    #[tokio::test]
    async fn readers_are_not_blocked_by_a_running_scan() {
        let prober = Arc::new(Responders::new(&[42], Duration::from_millis(300)));
        let session = Arc::new(session(prober));

        let scanning = Arc::clone(&session);
        let scan = tokio::spawn(async move { scanning.scan().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let read = tokio::time::timeout(Duration::from_millis(50), session.snapshot())
            .await
            .expect("snapshot read blocked behind the scan");
        assert_eq!(read.generation(), 0);

        assert_eq!(scan.await.unwrap().generation(), 1);
    }
}
