use anyhow::Context;
use colored::*;
use motorlink_common::config::Config;
use motorlink_common::success;
use motorlink_core::relay::CommandRelay;

use super::scan;
use crate::terminal::{format, print};

pub async fn ping(skip_scan: bool, cfg: &Config) -> anyhow::Result<()> {
    let session = match skip_scan {
        true => scan::without_scan(&cfg.scan)?,
        false => scan::discover(&cfg.scan).await?,
    };
    let relay = CommandRelay::new(&cfg.relay)?;

    print::header("connection test");
    let report = relay
        .test_connection(&session)
        .await
        .context("connection test failed")?;

    success!("Device at {} answered on {}", report.ip, cfg.relay.status_path);
    print::as_tree_one_level(vec![(
        "Status".to_string(),
        format::response_preview(&report.response).normal(),
    )]);
    Ok(())
}
