use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::*;
use motorlink_common::config::ScanConfig;
use motorlink_common::success;
use motorlink_core::discovery::{DiscoverySession, Snapshot};
use tracing::Instrument;

use crate::mprint;
use crate::terminal::{colors, format, print, spinner};

pub async fn scan(cfg: &ScanConfig) -> anyhow::Result<()> {
    discover(cfg).await?;
    Ok(())
}

/// Sweeps with a spinner, prints the result and hands back the session so
/// follow-up commands act on its selection.
pub async fn discover(cfg: &ScanConfig) -> anyhow::Result<DiscoverySession> {
    let span = spinner::discovery_span();
    let progress = span.clone();

    let session = DiscoverySession::new(cfg)?.with_progress(Arc::new(move |count: usize| {
        spinner::report_discovery_progress(&progress, count)
    }));

    let start_time: Instant = Instant::now();
    let snapshot = session.scan().instrument(span).await;

    discovery_ends(&snapshot, start_time.elapsed());
    Ok(session)
}

/// A session that has not scanned; the relay falls back to the configured address.
pub fn without_scan(cfg: &ScanConfig) -> anyhow::Result<DiscoverySession> {
    DiscoverySession::new(cfg)
}

fn discovery_ends(snapshot: &Snapshot, total_time: Duration) {
    if snapshot.is_empty() {
        no_devices_found(snapshot);
        return;
    }

    print::header("motor controller discovery");
    print_devices(snapshot);
    print_summary(snapshot, total_time);
}

fn no_devices_found(snapshot: &Snapshot) {
    print::header("zero devices detected");
    print::no_results();
    if let Some(subnet) = snapshot.subnet() {
        print::centerln(&format!("{}", format!("swept {subnet}").dimmed()));
    }
}

fn print_devices(snapshot: &Snapshot) {
    let devices = snapshot.devices();
    let selected_ip = snapshot.selected().map(|device| device.ip);

    for (idx, device) in devices.iter().enumerate() {
        let selected: bool = Some(device.ip) == selected_ip;
        let name: &str = if selected { "Motor controller" } else { "Candidate" };
        print::tree_head(idx, name);
        print::as_tree_one_level(format::device_to_details(device, selected));

        if idx + 1 != devices.len() {
            mprint!();
        }
    }
}

fn print_summary(snapshot: &Snapshot, total_time: Duration) {
    let count: usize = snapshot.devices().len();
    let noun: &str = if count == 1 { "device" } else { "devices" };
    let found: ColoredString = format!("{count} {noun}").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: ColoredString =
        format!("Discovery Complete: {found} identified in {total_time}").color(colors::TEXT_DEFAULT);

    print::fat_separator();
    print::centerln(&output.to_string());

    if let Some(device) = snapshot.selected() {
        success!("Auto-detected motor controller at {}", device.ip);
    }
}
