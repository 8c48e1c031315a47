//! Thin HTTP client for the daemon's `/v1` surface.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use esync_daemon::api_types::{ErrorBody, SchedulerResponse, StartRequest};
use esync_runtime::MonitoringStatus;
use esync_schemas::{ScanMetrics, SystemHealth, UptimeStats};
use serde::de::DeserializeOwned;
use tracing::debug;

pub struct DaemonClient {
    base: String,
    http: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn decode<T: DeserializeOwned>(&self, path: &str, resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("read response body of {path}"))?;
        debug!(path, status = status.as_u16(), bytes = body.len(), "daemon response");
        if !status.is_success() {
            match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(e) => bail!(
                    "daemon returned {} for {}: {}: {}",
                    status.as_u16(),
                    path,
                    e.error,
                    e.message
                ),
                Err(_) => bail!("daemon returned {} for {}", status.as_u16(), path),
            }
        }
        serde_json::from_slice(&body).with_context(|| format!("decode response of {path}"))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .with_context(|| format!("GET {} (is esync-daemon running?)", self.url(path)))?;
        self.decode(path, resp).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<&StartRequest>) -> Result<T> {
        let mut req = self.http.post(self.url(path));
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("POST {} (is esync-daemon running?)", self.url(path)))?;
        self.decode(path, resp).await
    }

    pub async fn monitoring_start(&self, interval_ms: Option<u64>) -> Result<SchedulerResponse> {
        let body = StartRequest { interval_ms };
        self.post("/v1/monitoring/start", Some(&body)).await
    }

    pub async fn monitoring_stop(&self) -> Result<SchedulerResponse> {
        self.post("/v1/monitoring/stop", None).await
    }

    pub async fn monitoring_scan(&self) -> Result<ScanMetrics> {
        self.post("/v1/monitoring/scan", None).await
    }

    pub async fn monitoring_status(&self) -> Result<MonitoringStatus> {
        self.get("/v1/monitoring/status").await
    }

    pub async fn monitoring_history(&self) -> Result<Vec<ScanMetrics>> {
        self.get("/v1/monitoring/history").await
    }

    pub async fn health_current(&self) -> Result<SystemHealth> {
        self.get("/v1/system-health").await
    }

    pub async fn health_check(&self) -> Result<SystemHealth> {
        self.post("/v1/system-health/check", None).await
    }

    pub async fn health_history(&self) -> Result<Vec<SystemHealth>> {
        self.get("/v1/system-health/history").await
    }

    pub async fn health_uptime(&self) -> Result<UptimeStats> {
        self.get("/v1/system-health/uptime").await
    }
}
