//! Shared dashboard state.
//!
//! Cloned into every handler. The discovery session, relay and uploader are
//! built once at startup; the link state is the only thing handlers mutate.

use std::net::Ipv4Addr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use motorlink_common::config::Config;
use motorlink_core::discovery::{DiscoverySession, Snapshot};
use motorlink_core::relay::{CommandReceipt, CommandRelay, ConnectionReport, MotorCommand, RelayError};
use motorlink_core::upload::{SketchUploader, UploadError, UploadOutcome};
use serde::Serialize;
use tokio::sync::RwLock;

use super::hub::{HubMessage, RealtimeHub, ScanView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Disconnected,
    Sending,
    Connected,
    Error,
}

/// What the dashboard shows about the device link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkState {
    /// Last command requested.
    pub command: u8,
    pub status: LinkStatus,
    pub last_update: DateTime<Utc>,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            command: MotorCommand::Off.code(),
            status: LinkStatus::Disconnected,
            last_update: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<DiscoverySession>,
    pub relay: Arc<CommandRelay>,
    pub uploader: Arc<SketchUploader>,
    pub hub: Arc<RealtimeHub>,
    link: Arc<RwLock<LinkState>>,
}

impl AppState {
    pub fn new(session: DiscoverySession, relay: CommandRelay, uploader: SketchUploader) -> Self {
        Self {
            session: Arc::new(session),
            relay: Arc::new(relay),
            uploader: Arc::new(uploader),
            hub: Arc::new(RealtimeHub::new()),
            link: Arc::new(RwLock::new(LinkState::default())),
        }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            DiscoverySession::new(&cfg.scan)?,
            CommandRelay::new(&cfg.relay)?,
            SketchUploader::new(&cfg.upload),
        ))
    }

    pub fn relay_fallback(&self) -> Option<Ipv4Addr> {
        self.relay.fallback_ip()
    }

    pub async fn link(&self) -> LinkState {
        self.link.read().await.clone()
    }

    /// Applies `update`, stamps the time and broadcasts the new state.
    pub async fn update_link<F>(&self, update: F) -> LinkState
    where
        F: FnOnce(&mut LinkState),
    {
        let state = {
            let mut link = self.link.write().await;
            update(&mut link);
            link.last_update = Utc::now();
            link.clone()
        };

        self.hub.broadcast(HubMessage::StateUpdate(state.clone())).await;
        state
    }

    pub async fn scan_view(&self) -> ScanView {
        ScanView::from(self.session.snapshot().await.as_ref())
    }

    /// Runs a scan and pushes the device list to every client.
    pub async fn scan(&self) -> Arc<Snapshot> {
        let snapshot = self.session.scan().await;
        self.hub
            .broadcast(HubMessage::DevicesDiscovered(snapshot.devices().to_vec()))
            .await;
        snapshot
    }

    pub async fn send_command(&self, command: MotorCommand) -> Result<CommandReceipt, RelayError> {
        self.update_link(|link| {
            link.command = command.code();
            link.status = LinkStatus::Sending;
        })
        .await;

        let result = self.relay.send_command(&self.session, command).await;

        let status = match &result {
            Ok(_) => LinkStatus::Connected,
            Err(_) => LinkStatus::Error,
        };
        self.update_link(|link| link.status = status).await;

        result
    }

    pub async fn test_connection(&self) -> Result<ConnectionReport, RelayError> {
        self.relay.test_connection(&self.session).await
    }

    pub async fn upload(&self, code: &str) -> Result<UploadOutcome, UploadError> {
        self.uploader.upload(code).await
    }
}
