use anyhow::Context;
use colored::*;
use motorlink_common::config::Config;
use motorlink_common::success;
use motorlink_core::relay::{CommandRelay, MotorCommand};

use super::scan;
use crate::terminal::{format, print};

pub async fn send(command: MotorCommand, skip_scan: bool, cfg: &Config) -> anyhow::Result<()> {
    let session = match skip_scan {
        true => scan::without_scan(&cfg.scan)?,
        false => scan::discover(&cfg.scan).await?,
    };
    let relay = CommandRelay::new(&cfg.relay)?;

    print::header("command relay");
    let receipt = relay
        .send_command(&session, command)
        .await
        .with_context(|| format!("command {command} was not delivered"))?;

    success!("Command {} delivered to {}", command, receipt.ip);
    print::as_tree_one_level(vec![
        ("Device".to_string(), receipt.ip.to_string().bold()),
        ("Reply".to_string(), format::response_preview(&receipt.response).normal()),
    ]);
    Ok(())
}
