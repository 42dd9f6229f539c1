#![cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use motorlink_common::config::{DEFAULT_BOARD, UploadConfig};
use motorlink_core::upload::{SketchUploader, UploadError, UploadOutcome};
use tempfile::TempDir;

const BLINK: &str = "void setup() {}\nvoid loop() {}\n";

struct FakeCli {
    _dir: TempDir,
    ok: PathBuf,
    failing: PathBuf,
}

/// Stand-in `arduino-cli` binaries that append their arguments to
/// `calls.log` next to the sketch directory.
///
/// Written once; exec must never race an open write handle.
fn fake_cli() -> &'static FakeCli {
    static CLI: OnceLock<FakeCli> = OnceLock::new();
    CLI.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let ok = write_script(dir.path(), "arduino-cli-ok", 0);
        let failing = write_script(dir.path(), "arduino-cli-failing", 1);
        FakeCli {
            _dir: dir,
            ok,
            failing,
        }
    })
}

fn write_script(dir: &Path, name: &str, exit_code: i32) -> PathBuf {
    let script = dir.join(name);
    let body = format!(
        "#!/bin/sh\n\
         [ \"$1\" = version ] && exit 0\n\
         for last; do :; done\n\
         echo \"$@\" >> \"$(dirname \"$last\")/calls.log\"\n\
         echo 'sketch error' >&2\n\
         exit {exit_code}\n"
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

fn calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn upload_config(work: &TempDir, cli_path: PathBuf, port: Option<&str>) -> UploadConfig {
    UploadConfig {
        cli_path,
        upload_port: port.map(str::to_string),
        work_dir: work.path().to_path_buf(),
        ..UploadConfig::default()
    }
}

#[tokio::test]
async fn compiles_then_uploads_with_port() {
    let work = TempDir::new().unwrap();
    let cli = fake_cli().ok.clone();
    let uploader = SketchUploader::new(&upload_config(&work, cli, Some("/dev/ttyACM0")));

    let outcome = uploader.upload(BLINK).await.unwrap();

    assert!(matches!(outcome, UploadOutcome::Uploaded { .. }), "got {outcome:?}");
    let sketch_dir = uploader.sketch_dir();
    let calls = calls(work.path());
    assert_eq!(calls.len(), 2, "calls: {calls:?}");
    assert_eq!(
        calls[0],
        format!("compile --fqbn {DEFAULT_BOARD} {}", sketch_dir.display())
    );
    assert_eq!(
        calls[1],
        format!(
            "upload --fqbn {DEFAULT_BOARD} --port /dev/ttyACM0 {}",
            sketch_dir.display()
        )
    );
    assert!(!sketch_dir.exists());
}

#[tokio::test]
async fn compile_only_without_port() {
    let work = TempDir::new().unwrap();
    let cli = fake_cli().ok.clone();
    let uploader = SketchUploader::new(&upload_config(&work, cli, None));

    let outcome = uploader.upload(BLINK).await.unwrap();

    assert!(matches!(outcome, UploadOutcome::Compiled { .. }), "got {outcome:?}");
    assert_eq!(calls(work.path()).len(), 1);
}

#[tokio::test]
async fn failed_compile_reports_stderr_and_cleans_up() {
    let work = TempDir::new().unwrap();
    let cli = fake_cli().failing.clone();
    let uploader = SketchUploader::new(&upload_config(&work, cli, Some("/dev/ttyACM0")));

    let err = uploader.upload(BLINK).await.unwrap_err();

    assert!(matches!(err, UploadError::Failed { .. }), "got {err:?}");
    assert!(err.stderr().unwrap_or_default().contains("sketch error"));
    assert_eq!(calls(work.path()).len(), 1, "upload must not run after a failed compile");
    assert!(!uploader.sketch_dir().exists());
}

#[tokio::test]
async fn missing_cli_keeps_the_sketch() {
    let work = TempDir::new().unwrap();
    fake_cli();
    let missing = work.path().join("no-such-arduino-cli");
    let uploader = SketchUploader::new(&upload_config(&work, missing, None));

    match uploader.upload(BLINK).await.unwrap() {
        UploadOutcome::Simulated { sketch } => {
            assert_eq!(std::fs::read_to_string(sketch).unwrap(), BLINK);
        }
        other => panic!("expected a simulated upload, got {other:?}"),
    }
}
