//! Snapshot sinks.
//!
//! Delivery is fire-and-forget per window: a failure is returned to the
//! publisher task, logged there, and the next window is published as usual.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::PublishConfig;
use crate::station::WeatherSnapshot;
use crate::traits::SnapshotSink;

/// Writes each snapshot to the log. Used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl SnapshotSink for LogSink {
    async fn publish(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("Failed to encode snapshot")?;
        info!("Weather snapshot: {}", json);
        Ok(())
    }
}

/// POSTs each snapshot as JSON to an HTTP endpoint.
#[derive(Clone, Debug)]
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    /// Create a new sink with configurable timeouts.
    pub fn new(url: String, config: &PublishConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SnapshotSink for HttpSink {
    async fn publish(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(snapshot)
            .send()
            .await
            .context("Failed to send snapshot")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Endpoint returned error status: {}", status);
        }

        Ok(())
    }
}

/// The sink chosen at startup from configuration.
#[derive(Clone, Debug)]
pub enum AnySink {
    Log(LogSink),
    Http(HttpSink),
}

impl AnySink {
    /// HTTP when an endpoint is configured, log-only otherwise.
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        match &config.endpoint {
            Some(url) => Ok(AnySink::Http(HttpSink::new(url.clone(), config)?)),
            None => Ok(AnySink::Log(LogSink)),
        }
    }
}

impl SnapshotSink for AnySink {
    async fn publish(&self, snapshot: &WeatherSnapshot) -> Result<()> {
        match self {
            AnySink::Log(sink) => sink.publish(snapshot).await,
            AnySink::Http(sink) => sink.publish(snapshot).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Units;

    // ==================== Construction Tests ====================

    #[test]
    fn test_http_sink_creation() {
        let config = PublishConfig {
            endpoint: None,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        };
        let sink = HttpSink::new("https://example.com/weather".to_string(), &config);
        assert!(sink.is_ok());
        assert_eq!(sink.unwrap().url(), "https://example.com/weather");
    }

    #[test]
    fn test_any_sink_without_endpoint_logs() {
        let sink = AnySink::from_config(&PublishConfig::default()).unwrap();
        assert!(matches!(sink, AnySink::Log(_)));
    }

    #[test]
    fn test_any_sink_with_endpoint_posts() {
        let config = PublishConfig {
            endpoint: Some("http://localhost:9/weather".to_string()),
            ..PublishConfig::default()
        };
        let sink = AnySink::from_config(&config).unwrap();
        match sink {
            AnySink::Http(http) => assert_eq!(http.url(), "http://localhost:9/weather"),
            AnySink::Log(_) => panic!("expected an HTTP sink"),
        }
    }

    // ==================== Delivery Tests ====================

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let snapshot = WeatherSnapshot::empty(Units::default());
        assert!(LogSink.publish(&snapshot).await.is_ok());
    }

    #[tokio::test]
    async fn test_http_sink_unreachable_endpoint_fails() {
        let config = PublishConfig {
            endpoint: None,
            request_timeout_secs: 2,
            connect_timeout_secs: 1,
        };
        // port 9 (discard) is not listening on test hosts
        let sink = HttpSink::new("http://127.0.0.1:9/weather".to_string(), &config).unwrap();
        let snapshot = WeatherSnapshot::empty(Units::default());
        assert!(sink.publish(&snapshot).await.is_err());
    }
}
