use std::time::Duration;

use esync_health::{HealthProbe, ProbeError, ProbeReport};
use esync_schemas::ComponentStatus;

/// Probe that always reports the same verdict, optionally after a delay.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    status: ComponentStatus,
    fail_with: Option<String>,
    delay: Option<Duration>,
}

impl StaticProbe {
    pub fn new(name: &str, status: ComponentStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            fail_with: None,
            delay: None,
        }
    }

    /// Probe whose check returns an error.
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(name, ComponentStatus::Critical)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl HealthProbe for StaticProbe {
    fn component(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<ProbeReport, ProbeError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if let Some(msg) = &self.fail_with {
            return Err(ProbeError::Other(msg.clone()));
        }
        Ok(match self.status {
            ComponentStatus::Healthy => ProbeReport::healthy(),
            other => ProbeReport::degraded(other, format!("scripted {}", other.as_str())),
        })
    }
}
