//! # Sketch Upload
//!
//! Compiles a sketch with `arduino-cli` and flashes it when an upload port is
//! configured. Without a usable `arduino-cli` the sketch is only written to
//! disk and the upload is reported as simulated.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use motorlink_common::config::UploadConfig;
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

const SKETCH_NAME: &str = "motorlink_sketch";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("no code provided")]
    EmptySketch,

    #[error("failed to prepare sketch at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("arduino-cli {step} timed out after {}s", .timeout.as_secs())]
    Timeout { step: &'static str, timeout: Duration },

    #[error("arduino-cli {step} failed")]
    Failed { step: &'static str, stderr: String },
}

impl UploadError {
    pub fn stderr(&self) -> Option<&str> {
        match self {
            UploadError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// `arduino-cli` is not available; the sketch was only saved.
    Simulated { sketch: PathBuf },
    /// Compiled, not uploaded because no port is configured.
    Compiled { compile_log: String },
    Uploaded {
        compile_log: String,
        upload_log: String,
    },
}

impl UploadOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            UploadOutcome::Simulated { .. } => "arduino-cli not installed, code saved to file",
            UploadOutcome::Compiled { .. } => {
                "code compiled successfully (no upload, port not specified)"
            }
            UploadOutcome::Uploaded { .. } => "code compiled and uploaded successfully",
        }
    }
}

pub struct SketchUploader {
    cfg: UploadConfig,
}

impl SketchUploader {
    pub fn new(cfg: &UploadConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn sketch_dir(&self) -> PathBuf {
        self.cfg.work_dir.join(SKETCH_NAME)
    }

    pub async fn upload(&self, code: &str) -> Result<UploadOutcome, UploadError> {
        if code.trim().is_empty() {
            return Err(UploadError::EmptySketch);
        }

        let sketch_dir = self.sketch_dir();
        let sketch = self.write_sketch(&sketch_dir, code).await?;
        debug!(path = %sketch.display(), "sketch written");

        if !self.cli_available().await {
            warn!("arduino-cli not found, code upload is simulated");
            return Ok(UploadOutcome::Simulated { sketch });
        }

        let outcome = self.build(&sketch_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&sketch_dir).await {
            warn!(path = %sketch_dir.display(), "failed to clean up sketch: {e}");
        }

        outcome
    }

    async fn write_sketch(&self, dir: &Path, code: &str) -> Result<PathBuf, UploadError> {
        let io_err = |source: std::io::Error| UploadError::Io {
            path: dir.to_path_buf(),
            source,
        };

        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;

        let sketch = dir.join(format!("{SKETCH_NAME}.ino"));
        tokio::fs::write(&sketch, code).await.map_err(io_err)?;
        Ok(sketch)
    }

    async fn cli_available(&self) -> bool {
        let status = Command::new(&self.cfg.cli_path)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        matches!(status, Ok(s) if s.success())
    }

    async fn build(&self, sketch_dir: &Path) -> Result<UploadOutcome, UploadError> {
        let dir = sketch_dir.to_string_lossy().into_owned();

        info!(board = %self.cfg.board, "compiling sketch");
        let compile_log = self
            .run(
                "compile",
                &["compile", "--fqbn", self.cfg.board.as_str(), dir.as_str()],
                self.cfg.compile_timeout,
            )
            .await?;

        let Some(port) = &self.cfg.upload_port else {
            info!("no upload port configured, compile only");
            return Ok(UploadOutcome::Compiled { compile_log });
        };

        info!(%port, "uploading sketch");
        let upload_log = self
            .run(
                "upload",
                &[
                    "upload",
                    "--fqbn",
                    self.cfg.board.as_str(),
                    "--port",
                    port.as_str(),
                    dir.as_str(),
                ],
                self.cfg.upload_timeout,
            )
            .await?;

        Ok(UploadOutcome::Uploaded {
            compile_log,
            upload_log,
        })
    }

    async fn run(
        &self,
        step: &'static str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String, UploadError> {
        let child = Command::new(&self.cfg.cli_path)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(UploadError::Failed {
                    step,
                    stderr: e.to_string(),
                });
            }
            Err(_) => return Err(UploadError::Timeout { step, timeout }),
        };

        if !output.status.success() {
            return Err(UploadError::Failed {
                step,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
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

    const SKETCH: &str = "void setup() {}\nvoid loop() {}\n";

    fn uploader(work_dir: &Path, cli: &str, port: Option<&str>) -> SketchUploader {
        SketchUploader::new(&UploadConfig {
            cli_path: PathBuf::from(cli),
            upload_port: port.map(str::to_string),
            work_dir: work_dir.to_path_buf(),
            compile_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(5),
            ..UploadConfig::default()
        })
    }

    #[tokio::test]
    async fn empty_code_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = uploader(dir.path(), "true", None).upload("  \n").await;
        assert!(matches!(result, Err(UploadError::EmptySketch)));
    }

    #[tokio::test]
    async fn missing_cli_simulates_and_keeps_the_sketch() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(dir.path(), "motorlink-no-such-arduino-cli", None);

        let outcome = uploader.upload(SKETCH).await.unwrap();

        let UploadOutcome::Simulated { sketch } = outcome else {
            panic!("expected a simulated upload, got {outcome:?}");
        };
        assert_eq!(sketch, dir.path().join("motorlink_sketch/motorlink_sketch.ino"));
        assert_eq!(std::fs::read_to_string(&sketch).unwrap(), SKETCH);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_version_check_simulates() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = uploader(dir.path(), "false", None).upload(SKETCH).await.unwrap();
        assert!(matches!(outcome, UploadOutcome::Simulated { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn compile_only_without_port_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(dir.path(), "true", None);

        let outcome = uploader.upload(SKETCH).await.unwrap();

        assert!(matches!(outcome, UploadOutcome::Compiled { .. }));
        assert!(!uploader.sketch_dir().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn uploads_when_port_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(dir.path(), "true", Some("/dev/ttyACM0"));

        let outcome = uploader.upload(SKETCH).await.unwrap();

        assert!(matches!(outcome, UploadOutcome::Uploaded { .. }));
        assert_eq!(outcome.message(), "code compiled and uploaded successfully");
        assert!(!uploader.sketch_dir().exists());
    }

    #[tokio::test]
    async fn previous_sketch_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = uploader(dir.path(), "motorlink-no-such-arduino-cli", None);
        std::fs::create_dir_all(uploader.sketch_dir()).unwrap();
        std::fs::write(uploader.sketch_dir().join("stale.ino"), "old").unwrap();

        uploader.upload(SKETCH).await.unwrap();

        assert!(!uploader.sketch_dir().join("stale.ino").exists());
    }
}
