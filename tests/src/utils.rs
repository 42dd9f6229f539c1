use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const LOOPBACK_PREFIX: [u8; 3] = [127, 0, 0];

pub fn loopback(host: u8) -> Ipv4Addr {
    let [a, b, c] = LOOPBACK_PREFIX;
    Ipv4Addr::new(a, b, c, host)
}

/// Binds `host` on an ephemeral port and returns the listener with the port picked.
pub async fn bind_any(host: u8) -> anyhow::Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(SocketAddr::from((loopback(host), 0)))
        .await
        .with_context(|| format!("failed to bind {}", loopback(host)))?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

pub async fn bind(host: u8, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from((loopback(host), port)))
        .await
        .with_context(|| format!("failed to bind {}:{port}", loopback(host)))
}

/// A fake motor controller answering the status and command endpoints.
pub fn device_router(name: &'static str) -> Router {
    Router::new()
        .route(
            "/status",
            get(move || async move {
                Json(json!({"device": name, "motor": "idle", "status": "ok"}))
            }),
        )
        .route(
            "/command",
            post(|Json(body): Json<Value>| async move {
                Json(json!({"status": "ok", "received": body["command"]}))
            }),
        )
}

pub fn spawn_device(listener: TcpListener, name: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = axum::serve(listener, device_router(name)).await;
    })
}

/// Accepts connections and never answers.
pub fn spawn_tarpit(listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    })
}
