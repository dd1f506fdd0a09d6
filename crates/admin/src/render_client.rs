//! HTTP client for the render node agent API (`/metrics`, `/start`, `/stop`).

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use reqwest::{Client, Response};
use rf_domain::error::{Error, Result};

/// Control commands a render node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCommand {
    Start,
    Stop,
}

impl RenderCommand {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Start => "/start",
            Self::Stop => "/stop",
        }
    }

    /// Past tense used in operator-facing messages.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
        }
    }
}

impl fmt::Display for RenderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
        })
    }
}

/// Shared across handlers and the discovery probe; `reqwest::Client`
/// pools connections internally.
#[derive(Debug, Clone)]
pub struct RenderClient {
    http: Client,
}

impl RenderClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { http })
    }

    fn url(address: Ipv4Addr, port: u16, path: &str) -> String {
        format!("http://{address}:{port}{path}")
    }

    /// GET `path` and require a 2xx status. Transport failures and other
    /// statuses both come back as [`Error::Unreachable`].
    async fn get_success(&self, address: Ipv4Addr, port: u16, path: &str) -> Result<Response> {
        let url = Self::url(address, port, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(address, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Unreachable {
                address: address.to_string(),
                reason: format!("GET {path} returned {status}"),
            });
        }
        Ok(resp)
    }

    /// GET the node's metrics document.
    pub async fn fetch_metrics(
        &self,
        address: Ipv4Addr,
        port: u16,
        path: &str,
    ) -> Result<serde_json::Value> {
        let resp = self.get_success(address, port, path).await?;
        resp.json().await.map_err(|e| unreachable(address, e))
    }

    /// Reachability check: a 2xx answer on the metrics path, whatever the body.
    pub async fn check_metrics(&self, address: Ipv4Addr, port: u16, path: &str) -> Result<()> {
        self.get_success(address, port, path).await.map(drop)
    }

    pub async fn send_command(&self, address: Ipv4Addr, port: u16, cmd: RenderCommand) -> Result<()> {
        let url = Self::url(address, port, cmd.path());
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| unreachable(address, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let reason = body["error"]
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("POST {} returned {status}", cmd.path()));
            return Err(Error::Http(reason));
        }
        tracing::debug!(address = %address, command = %cmd, "render node command accepted");
        Ok(())
    }
}

fn unreachable(address: Ipv4Addr, e: reqwest::Error) -> Error {
    Error::Unreachable {
        address: address.to_string(),
        reason: e.to_string(),
    }
}
