use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use motorlink_common::config::Config;
use motorlink_common::{success, warn};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::server::{self, AppState, LinkStatus};
use crate::terminal::print;

pub async fn serve(
    listen: SocketAddr,
    static_dir: Option<PathBuf>,
    startup_scan: bool,
    cfg: &Config,
) -> anyhow::Result<()> {
    let state = AppState::from_config(cfg)?;

    let mut app = server::create_router(state.clone());
    if let Some(dir) = &static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    let local = listener.local_addr().context("listener has no local address")?;

    print::header("dashboard");
    success!("Web interface available at http://{local}");
    success!("API available at http://{local}/api");
    if let Some(dir) = &static_dir {
        success!("Serving dashboard assets from {}", dir.display());
    }
    if cfg.upload.upload_port.is_none() {
        warn!("No upload port configured, sketches are compiled but not uploaded");
    }

    if startup_scan {
        tokio::spawn(run_startup_scan(state.clone()));
    }

    axum::serve(listener, app)
        .await
        .context("dashboard server stopped")
}

async fn run_startup_scan(state: AppState) {
    let snapshot = state.scan().await;

    let status = match snapshot.selected() {
        Some(device) => {
            success!("Motor controller auto-detected at {}", device.ip);
            LinkStatus::Connected
        }
        None => {
            match state.relay_fallback() {
                Some(ip) => {
                    warn!("No motor controller found, using fallback address {ip}");
                    if let Some(subnet) = snapshot.subnet() {
                        if !subnet.contains(ip) {
                            warn!("Fallback address {ip} lies outside the swept network {subnet}");
                        }
                    }
                }
                None => warn!("No motor controller found and no fallback address configured"),
            }
            LinkStatus::Error
        }
    };

    state.update_link(|link| link.status = status).await;
}
