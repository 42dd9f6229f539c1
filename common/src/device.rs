//! # Device Model
//!
//! Records that describe what a discovery sweep probes for and what it
//! finds: endpoint candidates, parsed response bodies and the devices that
//! survive deduplication.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Terms from the motor controller's status/command vocabulary.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "arduino",
    "motor",
    "command",
    "status",
    "armed",
    "running",
    "currentmotor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            other => Err(format!("unsupported probe method: {other}")),
        }
    }
}

/// A fixed (path, method) pair probed on every host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
}

impl Endpoint {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: HttpMethod::Get,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

impl FromStr for Endpoint {
    type Err = String;

    /// Parses `"/path"` (GET implied) or `"METHOD /path"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (method, path) = match s.split_once(char::is_whitespace) {
            Some((method, path)) => (method.parse::<HttpMethod>()?, path.trim()),
            None => (HttpMethod::Get, s),
        };

        if !path.starts_with('/') {
            return Err(format!("endpoint path must start with '/': {path}"));
        }

        Ok(Self {
            path: path.to_string(),
            method,
        })
    }
}

pub fn default_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::get("/status"),
        Endpoint::get("/"),
        Endpoint::get("/command"),
        Endpoint::get("/arduino"),
    ]
}

/// A response body, parsed as JSON when possible and kept as text otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw),
        }
    }

    /// Falsy bodies carry nothing to classify: empty text, `null`, `false`,
    /// `0` and `""`.
    pub fn is_empty(&self) -> bool {
        match self {
            ResponseBody::Text(text) => text.is_empty(),
            ResponseBody::Json(value) => match value {
                serde_json::Value::Null => true,
                serde_json::Value::Bool(b) => !b,
                serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
                serde_json::Value::String(s) => s.is_empty(),
                _ => false,
            },
        }
    }

    /// Objects and arrays.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            ResponseBody::Json(serde_json::Value::Object(_) | serde_json::Value::Array(_))
        )
    }

    /// Lower-cased serialization used for keyword matching.
    pub fn search_text(&self) -> String {
        match self {
            ResponseBody::Text(text) => text.to_lowercase(),
            ResponseBody::Json(value) => value.to_string().to_lowercase(),
        }
    }
}

/// One host that survived deduplication, with the endpoint that qualified it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub ip: Ipv4Addr,
    pub endpoint: String,
    pub method: HttpMethod,
    pub response: ResponseBody,
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
