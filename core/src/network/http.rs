use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use anyhow::Context;
use async_trait::async_trait;
use motorlink_common::config::ScanConfig;
use motorlink_common::device::{Endpoint, HttpMethod, ResponseBody};
use reqwest::{Client, Method};
use tracing::trace;

use crate::scanner::{ObservedResponse, ProbeFailure, ProbeOutcome, ProbeResult, Prober};

/// Probes hosts over plain HTTP with a hard per-request timeout.
pub struct HttpProber {
    client: Client,
    port: u16,
}

impl HttpProber {
    pub fn new(cfg: &ScanConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(cfg.probe_timeout)
            .connect_timeout(cfg.probe_timeout)
            .user_agent(cfg.user_agent.as_str())
            .no_proxy()
            .pool_max_idle_per_host(0)
            .build()
            .context("building the probe HTTP client")?;

        Ok(Self {
            client,
            port: cfg.device_port,
        })
    }

    pub fn url(&self, host: Ipv4Addr, endpoint: &Endpoint) -> String {
        format!("http://{host}:{}{}", self.port, endpoint.path)
    }

    async fn request(
        &self,
        host: Ipv4Addr,
        endpoint: &Endpoint,
    ) -> Result<ObservedResponse, reqwest::Error> {
        let response = self
            .client
            .request(to_method(endpoint.method), self.url(host, endpoint))
            .send()
            .await?;

        let status: u16 = response.status().as_u16();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let raw: String = response.text().await?;

        Ok(ObservedResponse {
            status,
            headers,
            body: ResponseBody::parse(raw),
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, host: Ipv4Addr, endpoint: &Endpoint) -> ProbeOutcome {
        let result = match self.request(host, endpoint).await {
            Ok(response) => ProbeResult::Observed(response),
            Err(e) => {
                trace!(%host, %endpoint, "probe failed: {e}");
                ProbeResult::Failed(ProbeFailure::from(&e))
            }
        };

        ProbeOutcome {
            host,
            endpoint: endpoint.clone(),
            result,
        }
    }
}

impl From<&reqwest::Error> for ProbeFailure {
    fn from(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeFailure::Timeout
        } else if e.is_connect() {
            ProbeFailure::Connect
        } else {
            ProbeFailure::Transport(e.to_string())
        }
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
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
