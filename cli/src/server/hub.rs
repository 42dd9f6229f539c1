//! RealtimeHub: WebSocket fan-out.
//!
//! Every connected client gets an unbounded channel of serialized
//! [`HubMessage`]s. State and device updates are broadcast; operation results
//! go only to the client that asked.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use motorlink_common::device::{DiscoveredDevice, ResponseBody};
use motorlink_core::discovery::Snapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use super::state::LinkState;

/// Server to client messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    StateUpdate(LinkState),
    DevicesDiscovered(Vec<DiscoveredDevice>),
    CommandResult(CommandResult),
    CodeUploadResult(CodeUploadResult),
    ConnectionTestResult(ConnectionTestResult),
    NetworkScanResult(ScanView),
}

impl HubMessage {
    fn kind(&self) -> &'static str {
        match self {
            HubMessage::StateUpdate(_) => "state_update",
            HubMessage::DevicesDiscovered(_) => "devices_discovered",
            HubMessage::CommandResult(_) => "command_result",
            HubMessage::CodeUploadResult(_) => "code_upload_result",
            HubMessage::ConnectionTestResult(_) => "connection_test_result",
            HubMessage::NetworkScanResult(_) => "network_scan_result",
        }
    }
}

/// Client to server messages.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SendCommand {
        command: i64,
        #[serde(default)]
        description: Option<String>,
    },
    UploadCode {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        timestamp: Option<String>,
    },
    TestConnection,
    ScanNetwork,
}

/// Result of a scan: `{devices, autoDetected}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanView {
    pub devices: Vec<DiscoveredDevice>,
    pub auto_detected: Option<DiscoveredDevice>,
}

impl From<&Snapshot> for ScanView {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            devices: snapshot.devices().to_vec(),
            auto_detected: snapshot.selected().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub success: bool,
    pub command: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_response: Option<ResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ip: Option<Ipv4Addr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeUploadResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ip: Option<Ipv4Addr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type ClientId = u64;

pub struct RealtimeHub {
    connections: RwLock<HashMap<ClientId, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn register(&self) -> (ClientId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(id, tx);
        info!(client = id, "dashboard client connected");
        (id, rx)
    }

    pub async fn unregister(&self, id: ClientId) {
        if self.connections.write().await.remove(&id).is_some() {
            info!(client = id, "dashboard client disconnected");
        }
    }

    pub async fn broadcast(&self, message: HubMessage) {
        let Some(json) = encode(&message) else {
            return;
        };

        let connections = self.connections.read().await;
        debug!(kind = message.kind(), clients = connections.len(), "broadcasting");

        for (id, tx) in connections.iter() {
            if let Err(e) = tx.send(json.clone()) {
                warn!(client = id, "failed to queue message: {e}");
            }
        }
    }

    pub async fn send_to(&self, id: ClientId, message: HubMessage) {
        let Some(json) = encode(&message) else {
            return;
        };

        if let Some(tx) = self.connections.read().await.get(&id) {
            if let Err(e) = tx.send(json) {
                warn!(client = id, "failed to queue {}: {e}", message.kind());
            }
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(message: &HubMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            error!(kind = message.kind(), "failed to serialize hub message: {e}");
            None
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
