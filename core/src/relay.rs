//! # Command Relay
//!
//! Delivers motor commands and connection tests to the device the discovery
//! session currently selects. The target address is resolved on every call,
//! so a new scan takes effect for the very next command.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use motorlink_common::config::RelayConfig;
use motorlink_common::device::ResponseBody;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::discovery::{DiscoverySession, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorCommand {
    /// Stop both motors and disarm.
    Off,
    Arm,
    RunMotor1,
    RunMotor2,
}

impl MotorCommand {
    pub const ALL: [MotorCommand; 4] = [
        MotorCommand::Off,
        MotorCommand::Arm,
        MotorCommand::RunMotor1,
        MotorCommand::RunMotor2,
    ];

    pub fn code(&self) -> u8 {
        match self {
            MotorCommand::Off => 0,
            MotorCommand::Arm => 1,
            MotorCommand::RunMotor1 => 2,
            MotorCommand::RunMotor2 => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MotorCommand::Off => "Turn off / disarm",
            MotorCommand::Arm => "Arm system",
            MotorCommand::RunMotor1 => "Run motor 1",
            MotorCommand::RunMotor2 => "Run motor 2",
        }
    }
}

impl TryFrom<i64> for MotorCommand {
    type Error = RelayError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MotorCommand::Off),
            1 => Ok(MotorCommand::Arm),
            2 => Ok(MotorCommand::RunMotor1),
            3 => Ok(MotorCommand::RunMotor2),
            other => Err(RelayError::InvalidCommand(other)),
        }
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no device detected and no fallback address configured")]
    NoTarget,

    #[error("invalid command {0}, must be 0-3")]
    InvalidCommand(i64),

    #[error("cannot connect to device at {ip}:{port}, check that it is powered and on the network")]
    Unreachable {
        ip: Ipv4Addr,
        port: u16,
        #[source]
        source: reqwest::Error,
    },

    #[error("device at {ip} answered with status {status}")]
    Rejected {
        ip: Ipv4Addr,
        status: u16,
        body: ResponseBody,
    },

    #[error("request to device at {ip} failed")]
    Transport {
        ip: Ipv4Addr,
        #[source]
        source: reqwest::Error,
    },
}

impl RelayError {
    /// The device address involved, if the request got that far.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            RelayError::Unreachable { ip, .. }
            | RelayError::Rejected { ip, .. }
            | RelayError::Transport { ip, .. } => Some(*ip),
            RelayError::NoTarget | RelayError::InvalidCommand(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReceipt {
    pub ip: Ipv4Addr,
    pub command: u8,
    pub response: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub ip: Ipv4Addr,
    pub response: ResponseBody,
}

#[derive(Serialize)]
struct CommandPayload {
    command: u8,
    timestamp: String,
}

pub struct CommandRelay {
    client: Client,
    cfg: RelayConfig,
}

impl CommandRelay {
    pub fn new(cfg: &RelayConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .no_proxy()
            .build()
            .context("building the relay HTTP client")?;

        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    pub fn fallback_ip(&self) -> Option<Ipv4Addr> {
        self.cfg.fallback_ip
    }

    /// Selected device first, then the configured fallback.
    pub fn resolve_target(&self, snapshot: &Snapshot) -> Result<Ipv4Addr, RelayError> {
        snapshot
            .selected()
            .map(|device| device.ip)
            .or(self.cfg.fallback_ip)
            .ok_or(RelayError::NoTarget)
    }

    pub async fn send_command(
        &self,
        session: &DiscoverySession,
        command: MotorCommand,
    ) -> Result<CommandReceipt, RelayError> {
        let snapshot = session.snapshot().await;
        let ip = self.resolve_target(&snapshot)?;
        self.send_command_to(ip, command).await
    }

    pub async fn send_command_to(
        &self,
        ip: Ipv4Addr,
        command: MotorCommand,
    ) -> Result<CommandReceipt, RelayError> {
        let payload = CommandPayload {
            command: command.code(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let url = self.url(ip, &self.cfg.command_path);
        info!(%ip, "sending command {command}");

        let request = self.client.post(&url).json(&payload);
        let response = self.execute(ip, request, self.cfg.command_timeout).await?;

        Ok(CommandReceipt {
            ip,
            command: command.code(),
            response,
        })
    }

    pub async fn test_connection(
        &self,
        session: &DiscoverySession,
    ) -> Result<ConnectionReport, RelayError> {
        let snapshot = session.snapshot().await;
        let ip = self.resolve_target(&snapshot)?;
        self.test_connection_to(ip).await
    }

    pub async fn test_connection_to(&self, ip: Ipv4Addr) -> Result<ConnectionReport, RelayError> {
        let url = self.url(ip, &self.cfg.status_path);
        debug!(%ip, "testing connection");

        let request = self.client.get(&url);
        let response = self.execute(ip, request, self.cfg.status_timeout).await?;

        Ok(ConnectionReport { ip, response })
    }

    fn url(&self, ip: Ipv4Addr, path: &str) -> String {
        format!("http://{ip}:{}{path}", self.cfg.device_port)
    }

    async fn execute(
        &self,
        ip: Ipv4Addr,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<ResponseBody, RelayError> {
        let port = self.cfg.device_port;
        let classify = |source: reqwest::Error| {
            if source.is_connect() {
                RelayError::Unreachable { ip, port, source }
            } else {
                RelayError::Transport { ip, source }
            }
        };

        let response = request.timeout(timeout).send().await.map_err(classify)?;
        let status = response.status();
        let raw = response.text().await.map_err(classify)?;
        let body = ResponseBody::parse(raw);

        if !status.is_success() {
            warn!(%ip, status = status.as_u16(), "device rejected the request");
            return Err(RelayError::Rejected {
                ip,
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
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
