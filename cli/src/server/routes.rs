use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use motorlink_core::relay::MotorCommand;
use motorlink_core::upload::UploadError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::hub::{
    ClientId, ClientMessage, CodeUploadResult, CommandResult, ConnectionTestResult, HubMessage,
    ScanView,
};
use super::state::{AppState, LinkState};
use motorlink_common::device::DiscoveredDevice;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(link_status))
        .route("/api/devices", get(list_devices))
        .route("/api/scan", post(scan_network))
        .route("/api/command", post(send_command))
        .route("/api/upload-code", post(upload_code))
        .route("/api/test-connection", get(test_connection))
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DevicesView {
    discovered: Vec<DiscoveredDevice>,
    auto_detected: Option<DiscoveredDevice>,
}

/// Fields stay untyped so a wrong type is a 400, not an extractor rejection.
#[derive(Debug, Deserialize)]
struct CommandRequest {
    #[serde(default)]
    command: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    #[serde(default)]
    code: Option<Value>,
}

async fn link_status(State(state): State<AppState>) -> Json<LinkState> {
    Json(state.link().await)
}

async fn list_devices(State(state): State<AppState>) -> Json<DevicesView> {
    let view = state.scan_view().await;
    Json(DevicesView {
        discovered: view.devices,
        auto_detected: view.auto_detected,
    })
}

async fn scan_network(State(state): State<AppState>) -> Json<ScanView> {
    let snapshot = state.scan().await;
    Json(ScanView::from(snapshot.as_ref()))
}

async fn send_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResult>, ApiError> {
    let Some(code) = request.command.as_ref().and_then(Value::as_i64) else {
        return Err(ApiError::BadRequest("Invalid command. Must be 0-3.".to_string()));
    };
    let command = MotorCommand::try_from(code)?;

    let receipt = state.send_command(command).await?;

    Ok(Json(CommandResult {
        success: true,
        command: code,
        description: Some(command.description().to_string()),
        error: None,
        device_response: Some(receipt.response),
        device_ip: Some(receipt.ip),
    }))
}

async fn upload_code(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<CodeUploadResult>, ApiError> {
    let code = request.code.as_ref().and_then(Value::as_str).unwrap_or_default();
    if code.trim().is_empty() {
        return Err(ApiError::BadRequest("No code provided.".to_string()));
    }

    let outcome = state.upload(code).await?;

    Ok(Json(CodeUploadResult {
        success: true,
        message: Some(outcome.message().to_string()),
        error: None,
        stderr: None,
        timestamp: None,
    }))
}

async fn test_connection(
    State(state): State<AppState>,
) -> Result<Json<ConnectionTestResult>, ApiError> {
    let report = state.test_connection().await?;

    Ok(Json(ConnectionTestResult {
        success: true,
        data: Some(report.response),
        device_ip: Some(report.ip),
        error: None,
    }))
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (client, mut rx) = state.hub.register().await;

    state.hub.send_to(client, HubMessage::StateUpdate(state.link().await)).await;
    state
        .hub
        .send_to(
            client,
            HubMessage::DevicesDiscovered(state.scan_view().await.devices),
        )
        .await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let handler_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_client_message(&handler_state, client, message).await,
                    Err(e) => debug!(client, "ignoring malformed client message: {e}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(client, "websocket error: {e}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.hub.unregister(client).await;
}

async fn handle_client_message(state: &AppState, client: ClientId, message: ClientMessage) {
    let reply = match message {
        ClientMessage::SendCommand {
            command,
            description,
        } => {
            info!(client, command, "command requested");
            HubMessage::CommandResult(command_result(state, command, description).await)
        }
        ClientMessage::UploadCode { code, timestamp } => {
            info!(client, "code upload requested");
            HubMessage::CodeUploadResult(upload_result(state, code, timestamp).await)
        }
        ClientMessage::TestConnection => {
            let result = match state.test_connection().await {
                Ok(report) => ConnectionTestResult {
                    success: true,
                    data: Some(report.response),
                    device_ip: Some(report.ip),
                    error: None,
                },
                Err(e) => ConnectionTestResult {
                    success: false,
                    data: None,
                    device_ip: e.ip(),
                    error: Some(e.to_string()),
                },
            };
            HubMessage::ConnectionTestResult(result)
        }
        ClientMessage::ScanNetwork => {
            let snapshot = state.scan().await;
            HubMessage::NetworkScanResult(ScanView::from(snapshot.as_ref()))
        }
    };

    state.hub.send_to(client, reply).await;
}

async fn command_result(state: &AppState, code: i64, description: Option<String>) -> CommandResult {
    let result = match MotorCommand::try_from(code) {
        Ok(command) => state.send_command(command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(receipt) => CommandResult {
            success: true,
            command: code,
            description,
            error: None,
            device_response: Some(receipt.response),
            device_ip: Some(receipt.ip),
        },
        Err(e) => CommandResult {
            success: false,
            command: code,
            description,
            error: Some(e.to_string()),
            device_response: None,
            device_ip: e.ip(),
        },
    }
}

async fn upload_result(
    state: &AppState,
    code: Option<String>,
    timestamp: Option<String>,
) -> CodeUploadResult {
    let code = code.unwrap_or_default();

    match state.upload(&code).await {
        Ok(outcome) => CodeUploadResult {
            success: true,
            message: Some(outcome.message().to_string()),
            error: None,
            stderr: None,
            timestamp,
        },
        Err(e) => CodeUploadResult {
            success: false,
            message: None,
            stderr: e.stderr().map(str::to_string),
            error: Some(upload_error_message(&e)),
            timestamp,
        },
    }
}

fn upload_error_message(e: &UploadError) -> String {
    match e {
        UploadError::Io { source, .. } => format!("{e}: {source}"),
        _ => e.to_string(),
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
    use async_trait::async_trait;
    use motorlink_common::config::{RelayConfig, ScanConfig, UploadConfig};
    use motorlink_common::device::{Endpoint, ResponseBody};
    use motorlink_common::network::range::Subnet24;
    use motorlink_common::network::target::Target;
    use motorlink_core::discovery::DiscoverySession;
    use motorlink_core::relay::CommandRelay;
    use motorlink_core::scanner::{ObservedResponse, ProbeFailure, ProbeOutcome, Prober};
    use motorlink_core::upload::SketchUploader;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;

    /// Only 10.0.0.42 answers, on `/status`.
    struct OneDevice;

    #[async_trait]
    impl Prober for OneDevice {
        async fn probe(&self, host: Ipv4Addr, endpoint: &Endpoint) -> ProbeOutcome {
            if host == Ipv4Addr::new(10, 0, 0, 42) && endpoint.path == "/status" {
                return ProbeOutcome::observed(
                    host,
                    endpoint.clone(),
                    ObservedResponse {
                        status: 200,
                        headers: BTreeMap::new(),
                        body: ResponseBody::parse(r#"{"status":"ok","armed":false}"#.to_string()),
                    },
                );
            }
            ProbeOutcome::failed(host, endpoint.clone(), ProbeFailure::Connect)
        }
    }

    async fn spawn_app() -> (SocketAddr, AppState) {
        let scan = ScanConfig {
            target: Target::Subnet {
                subnet: Subnet24::new([10, 0, 0]),
            },
            ..ScanConfig::default()
        };
        let work_dir = std::env::temp_dir().join(format!("motorlink-api-{}", std::process::id()));
        let state = AppState::new(
            DiscoverySession::with_prober(Arc::new(OneDevice), &scan),
            CommandRelay::new(&RelayConfig::default()).unwrap(),
            SketchUploader::new(&UploadConfig {
                cli_path: "motorlink-no-such-arduino-cli".into(),
                work_dir,
                ..UploadConfig::default()
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = create_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, state)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[tokio::test]
    async fn status_starts_disconnected() {
        let (addr, _) = spawn_app().await;
        let body: Value = client()
            .get(format!("http://{addr}/api/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "disconnected");
        assert_eq!(body["command"], 0);
    }

    #[tokio::test]
    async fn scan_then_devices_report_the_selection() {
        let (addr, _) = spawn_app().await;

        let scan: Value = client()
            .post(format!("http://{addr}/api/scan"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(scan["devices"].as_array().map(Vec::len), Some(1));
        assert_eq!(scan["autoDetected"]["ip"], "10.0.0.42");
        assert_eq!(scan["autoDetected"]["endpoint"], "/status");

        let devices: Value = client()
            .get(format!("http://{addr}/api/devices"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(devices["discovered"], scan["devices"]);
        assert_eq!(devices["autoDetected"], scan["autoDetected"]);
    }

    #[tokio::test]
    async fn invalid_or_missing_command_is_bad_request() {
        let (addr, _) = spawn_app().await;

        for body in [
            json!({"command": 4}),
            json!({"command": -1}),
            json!({}),
            json!({"command": "abc"}),
            json!({"command": 1.5}),
            json!({"command": null}),
        ] {
            let response = client()
                .post(format!("http://{addr}/api/command"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "body {body}");
        }
    }

    #[tokio::test]
    async fn command_without_target_reports_no_target() {
        let (addr, state) = spawn_app().await;

        let response = client()
            .post(format!("http://{addr}/api/command"))
            .json(&json!({"command": 1}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "NO_TARGET");

        let link = state.link().await;
        assert_eq!(link.command, 1);
        assert_eq!(link.status, crate::server::state::LinkStatus::Error);
    }

    #[tokio::test]
    async fn upload_requires_code() {
        let (addr, _) = spawn_app().await;

        for body in [json!({}), json!({"code": "  "}), json!({"code": 5})] {
            let response = client()
                .post(format!("http://{addr}/api/upload-code"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST, "body {body}");
        }
    }

    #[tokio::test]
    async fn upload_without_cli_is_simulated() {
        let (addr, _) = spawn_app().await;

        let body: Value = client()
            .post(format!("http://{addr}/api/upload-code"))
            .json(&json!({"code": "void setup() {}\nvoid loop() {}\n"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "arduino-cli not installed, code saved to file");
    }
}
