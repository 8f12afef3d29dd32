//! HTTP client for the portal's `/api` endpoints.

use portal_core::networks::{rank, DedupPolicy, NetworkRecord, RankedNetwork};
use portal_core::Credentials;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

pub type ApiResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    networks: Vec<NetworkRecord>,
}

#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: String,
    dedup: DedupPolicy,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        // 扫描在设备端可能需要数秒
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            dedup: DedupPolicy::LastSeen,
        })
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// `GET /api/scan`. The list is ranked again locally so portals that
    /// return raw scans (duplicates, no tier) render the same way.
    pub async fn scan(&self) -> ApiResult<Vec<RankedNetwork>> {
        let resp = self
            .http
            .get(format!("{}/api/scan", self.base_url))
            .send()
            .await?;
        let resp = check(resp).await?;
        let body: ScanResponse = resp.json().await?;
        tracing::debug!("scan returned {} records", body.networks.len());
        Ok(rank(body.networks, self.dedup))
    }

    /// `GET /api/connect?ssid=..&password=..`; success is any 2xx.
    pub async fn connect(&self, creds: &Credentials) -> ApiResult<()> {
        let resp = self
            .http
            .get(format!("{}/api/connect", self.base_url))
            .query(&[("ssid", &creds.ssid), ("password", &creds.password)])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

async fn check(resp: reqwest::Response) -> ApiResult<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    // JSON 错误体优先取 "error" 字段
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str().map(String::from)))
        .unwrap_or(text);
    Err(ClientError::Status { status, message })
}
