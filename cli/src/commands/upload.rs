use std::path::Path;

use anyhow::Context;
use motorlink_common::config::UploadConfig;
use motorlink_common::{error, success, warn};
use motorlink_core::upload::{SketchUploader, UploadError, UploadOutcome};

use crate::mprint;
use crate::terminal::print;

pub async fn upload(file: &Path, cfg: &UploadConfig) -> anyhow::Result<()> {
    let code: String = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read sketch {}", file.display()))?;

    print::header("sketch upload");
    let uploader = SketchUploader::new(cfg);

    let outcome = match uploader.upload(&code).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if let UploadError::Failed { stderr, .. } = &e {
                error!("arduino-cli output:");
                for line in stderr.lines() {
                    mprint!(line);
                }
            }
            return Err(e).context("sketch upload failed");
        }
    };

    match &outcome {
        UploadOutcome::Simulated { sketch } => {
            warn!("{}", outcome.message());
            success!("Sketch saved to {}", sketch.display());
        }
        UploadOutcome::Compiled { .. } | UploadOutcome::Uploaded { .. } => {
            success!("{}", capitalize(outcome.message()));
        }
    }
    Ok(())
}

fn capitalize(msg: &str) -> String {
    let mut chars = msg.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
