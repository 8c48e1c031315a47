use std::time::Duration;

use esync_schemas::ComponentStatus;
use tokio::time::Instant;

use crate::{HealthProbe, ProbeError, ProbeReport};

/// Map an HTTP status code and latency to a component verdict.
pub fn classify_http_status(code: u16, elapsed: Duration, slow: Duration) -> ProbeReport {
    let report = match code {
        200..=299 if elapsed > slow => ProbeReport::degraded(
            ComponentStatus::Warning,
            format!("slow response: {} ms", elapsed.as_millis()),
        ),
        200..=299 => ProbeReport::healthy(),
        400..=499 => ProbeReport::degraded(ComponentStatus::Warning, format!("http status {code}")),
        500..=599 => ProbeReport::degraded(ComponentStatus::Critical, format!("http status {code}")),
        _ => ProbeReport::degraded(ComponentStatus::Warning, format!("unexpected http status {code}")),
    };
    report.detail("http_status", code)
}

/// GET probe against one configured endpoint. An unconfigured endpoint is
/// reported as `unknown`.
pub struct HttpProbe {
    component: &'static str,
    url: Option<String>,
    client: reqwest::Client,
    slow: Duration,
}

impl HttpProbe {
    pub fn new(
        component: &'static str,
        url: Option<String>,
        client: reqwest::Client,
        slow: Duration,
    ) -> Self {
        Self {
            component,
            url,
            client,
            slow,
        }
    }
}

#[async_trait::async_trait]
impl HealthProbe for HttpProbe {
    fn component(&self) -> &str {
        self.component
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        let Some(url) = self.url.as_deref() else {
            return Ok(ProbeReport::degraded(
                ComponentStatus::Unknown,
                "no endpoint configured",
            ));
        };

        let started = Instant::now();
        let resp = self.client.get(url).send().await?;
        let report = classify_http_status(resp.status().as_u16(), started.elapsed(), self.slow);
        Ok(report.detail("url", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const SLOW: Duration = Duration::from_millis(2000);

    #[test]
    fn status_classes() {
        let fast = Duration::from_millis(20);
        assert_eq!(classify_http_status(200, fast, SLOW).status, ComponentStatus::Healthy);
        assert_eq!(classify_http_status(204, fast, SLOW).status, ComponentStatus::Healthy);
        assert_eq!(classify_http_status(404, fast, SLOW).status, ComponentStatus::Warning);
        assert_eq!(classify_http_status(503, fast, SLOW).status, ComponentStatus::Critical);
    }

    #[test]
    fn slow_success_is_warning() {
        let r = classify_http_status(200, Duration::from_millis(2500), SLOW);
        assert_eq!(r.status, ComponentStatus::Warning);
        assert_eq!(r.error.as_deref(), Some("slow response: 2500 ms"));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_unknown() {
        let p = HttpProbe::new("website", None, reqwest::Client::new(), SLOW);
        let r = p.probe().await.unwrap();
        assert_eq!(r.status, ComponentStatus::Unknown);
    }

    #[tokio::test]
    async fn probes_live_endpoint() {
        let server = MockServer::start_async().await;
        let ok = server
            .mock_async(|when, then| {
                when.method(GET).path("/healthz");
                then.status(200).body("ok");
            })
            .await;
        let down = server
            .mock_async(|when, then| {
                when.method(GET).path("/storage");
                then.status(502);
            })
            .await;

        let client = reqwest::Client::new();
        let up = HttpProbe::new("api", Some(server.url("/healthz")), client.clone(), SLOW);
        let bad = HttpProbe::new("storage", Some(server.url("/storage")), client, SLOW);

        assert_eq!(up.probe().await.unwrap().status, ComponentStatus::Healthy);
        let r = bad.probe().await.unwrap();
        assert_eq!(r.status, ComponentStatus::Critical);
        assert_eq!(r.details.get("http_status"), Some(&serde_json::json!(502)));

        ok.assert_async().await;
        down.assert_async().await;
    }
}
