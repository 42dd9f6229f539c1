pub mod ping;
pub mod scan;
pub mod send;
pub mod serve;
pub mod upload;

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use motorlink_common::config::{
    ClassifierPolicy, Config, DEFAULT_BOARD, DEFAULT_MAX_IN_FLIGHT, RelayConfig, ScanConfig, UploadConfig,
};
use motorlink_common::device::{self, Endpoint};
use motorlink_common::network::target::Target;
use motorlink_core::relay::MotorCommand;

#[derive(Parser)]
#[command(name = "motorlink")]
#[command(about = "Finds motor controllers on the local network and drives them.")]
#[command(version)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(flatten)]
    pub relay: RelayArgs,

    #[command(flatten)]
    pub upload: UploadArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep the network for motor controllers
    #[command(alias = "s")]
    Scan,
    /// Send a motor command: 0 off, 1 arm, 2 motor 1, 3 motor 2
    #[command(alias = "c")]
    Send {
        #[arg(value_parser = parse_motor_command)]
        command: MotorCommand,
        /// Use the fallback address instead of scanning first
        #[arg(long)]
        skip_scan: bool,
    },
    /// Check that the device answers on its status endpoint
    #[command(alias = "p")]
    Ping {
        /// Use the fallback address instead of scanning first
        #[arg(long)]
        skip_scan: bool,
    },
    /// Compile and upload a sketch with arduino-cli
    #[command(alias = "u")]
    Upload { file: PathBuf },
    /// Run the dashboard API and event stream
    Serve {
        #[arg(long, env = "MOTORLINK_LISTEN", default_value = "0.0.0.0:3000")]
        listen: SocketAddr,
        /// Dashboard assets served at `/`
        #[arg(long, env = "MOTORLINK_STATIC_DIR")]
        static_dir: Option<PathBuf>,
        #[arg(long)]
        no_startup_scan: bool,
    },
}

#[derive(Args)]
pub struct ScanArgs {
    /// "lan", a /24 in CIDR notation, or any address inside the /24
    #[arg(long, short, global = true, env = "MOTORLINK_TARGET", default_value = "lan")]
    pub target: Target,

    #[arg(long, global = true, env = "MOTORLINK_DEVICE_PORT", default_value_t = 80)]
    pub device_port: u16,

    #[arg(long, global = true, env = "MOTORLINK_PROBE_TIMEOUT_MS", default_value_t = 2_000)]
    pub probe_timeout_ms: u64,

    #[arg(long, global = true, env = "MOTORLINK_TASK_TIMEOUT_MS", default_value_t = 1_000)]
    pub task_timeout_ms: u64,

    /// Concurrent probes; a silent network takes about (probes / this) task timeouts
    #[arg(long, global = true, env = "MOTORLINK_MAX_IN_FLIGHT", default_value_t = DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Probe endpoints, "/path" or "METHOD /path"
    #[arg(long = "endpoint", global = true, env = "MOTORLINK_ENDPOINTS", value_delimiter = ',')]
    pub endpoints: Vec<Endpoint>,

    /// Keywords that mark a response as coming from a motor controller
    #[arg(long = "keyword", global = true, env = "MOTORLINK_KEYWORDS", value_delimiter = ',')]
    pub keywords: Vec<String>,

    /// "permissive" also accepts any JSON response, "keyword-only" does not
    #[arg(long, global = true, env = "MOTORLINK_POLICY", default_value = "permissive")]
    pub policy: ClassifierPolicy,
}

#[derive(Args)]
pub struct RelayArgs {
    /// Device address used when nothing was auto-detected
    #[arg(long, global = true, env = "MOTORLINK_FALLBACK_IP")]
    pub fallback_ip: Option<Ipv4Addr>,

    #[arg(long, global = true, env = "MOTORLINK_COMMAND_TIMEOUT_MS", default_value_t = 5_000)]
    pub command_timeout_ms: u64,

    #[arg(long, global = true, env = "MOTORLINK_STATUS_TIMEOUT_MS", default_value_t = 3_000)]
    pub status_timeout_ms: u64,
}

#[derive(Args)]
pub struct UploadArgs {
    #[arg(long, global = true, env = "MOTORLINK_ARDUINO_CLI", default_value = "arduino-cli")]
    pub arduino_cli: PathBuf,

    #[arg(long, global = true, env = "MOTORLINK_BOARD", default_value = DEFAULT_BOARD)]
    pub board: String,

    /// Serial port to flash; compile only when unset
    #[arg(long, global = true, env = "MOTORLINK_UPLOAD_PORT")]
    pub upload_port: Option<String>,

    #[arg(long, global = true, env = "MOTORLINK_WORK_DIR")]
    pub work_dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn config(&self) -> Config {
        Config {
            scan: self.scan.to_config(),
            relay: self.relay.to_config(self.scan.device_port),
            upload: self.upload.to_config(),
        }
    }
}

impl ScanArgs {
    fn to_config(&self) -> ScanConfig {
        let defaults = ScanConfig::default();

        ScanConfig {
            target: self.target,
            device_port: self.device_port,
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            task_timeout: Duration::from_millis(self.task_timeout_ms),
            max_in_flight: self.max_in_flight,
            endpoints: if self.endpoints.is_empty() {
                device::default_endpoints()
            } else {
                self.endpoints.clone()
            },
            keywords: if self.keywords.is_empty() {
                defaults.keywords
            } else {
                self.keywords.clone()
            },
            policy: self.policy,
            user_agent: defaults.user_agent,
        }
    }
}

impl RelayArgs {
    fn to_config(&self, device_port: u16) -> RelayConfig {
        RelayConfig {
            device_port,
            command_timeout: Duration::from_millis(self.command_timeout_ms),
            status_timeout: Duration::from_millis(self.status_timeout_ms),
            fallback_ip: self.fallback_ip,
            ..RelayConfig::default()
        }
    }
}

impl UploadArgs {
    fn to_config(&self) -> UploadConfig {
        let defaults = UploadConfig::default();

        UploadConfig {
            cli_path: self.arduino_cli.clone(),
            board: self.board.clone(),
            upload_port: self.upload_port.clone(),
            work_dir: self.work_dir.clone().unwrap_or(defaults.work_dir),
            ..defaults
        }
    }
}

fn parse_motor_command(s: &str) -> Result<MotorCommand, String> {
    let value: i64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a command number"))?;
    MotorCommand::try_from(value).map_err(|e| e.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
