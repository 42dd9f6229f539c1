//! Runtime configuration.
//!
//! Every setting has a default here; the CLI overrides them from flags and
//! environment variables.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::device::{self, Endpoint};
use crate::network::target::Target;

pub const DEFAULT_DEVICE_PORT: u16 = 80;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(1);
/// Enough for a default sweep (254 hosts × 4 endpoints) to run in two rounds.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 512;
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_BOARD: &str = "arduino:renesas_uno:unor4wifi";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub scan: ScanConfig,
    pub relay: RelayConfig,
    pub upload: UploadConfig,
}

/// How strictly responses are matched against the device vocabulary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierPolicy {
    /// Keyword match, or any structured (JSON) body.
    #[default]
    Permissive,
    /// Keyword match only.
    KeywordOnly,
}

impl FromStr for ClassifierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(ClassifierPolicy::Permissive),
            "keyword-only" | "keyword_only" | "strict" => Ok(ClassifierPolicy::KeywordOnly),
            other => Err(format!("unknown classifier policy: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: Target,
    pub device_port: u16,
    /// Timeout of the HTTP request itself.
    pub probe_timeout: Duration,
    /// Outer bound on one probe task once it is running.
    pub task_timeout: Duration,
    pub max_in_flight: usize,
    pub endpoints: Vec<Endpoint>,
    pub keywords: Vec<String>,
    pub policy: ClassifierPolicy,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: Target::Lan,
            device_port: DEFAULT_DEVICE_PORT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            endpoints: device::default_endpoints(),
            keywords: device::DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            policy: ClassifierPolicy::default(),
            user_agent: format!("motorlink-detector/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub device_port: u16,
    pub command_path: String,
    pub status_path: String,
    pub command_timeout: Duration,
    pub status_timeout: Duration,
    /// Used when no device has been auto-detected.
    pub fallback_ip: Option<Ipv4Addr>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            device_port: DEFAULT_DEVICE_PORT,
            command_path: "/command".to_string(),
            status_path: "/status".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            fallback_ip: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cli_path: PathBuf,
    pub board: String,
    /// Compile only when unset.
    pub upload_port: Option<String>,
    pub work_dir: PathBuf,
    pub compile_timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            cli_path: PathBuf::from("arduino-cli"),
            board: DEFAULT_BOARD.to_string(),
            upload_port: None,
            work_dir: std::env::temp_dir(),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
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
