use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use reqwest::ClientBuilder;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::deserialize_secs;
use crate::errors::Result;
use crate::transport::RawResponse;
use crate::transport::Transport;

/// Settings of the reqwest session, the `[http]` table of the config file
///
/// Durations are read as seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Maximum idle connections per host (default: 16)
    pub pool_max_idle_per_host: usize,

    /// Idle timeout for pooled connections (default: 90s)
    #[serde(deserialize_with = "deserialize_secs")]
    pub pool_idle_timeout: Duration,

    /// Connection establishment timeout (default: 10s)
    #[serde(deserialize_with = "deserialize_secs")]
    pub connect_timeout: Duration,

    /// Total request timeout (default: 60s, bulk history can be slow)
    #[serde(deserialize_with = "deserialize_secs")]
    pub request_timeout: Duration,

    /// TCP keepalive interval (default: 60s)
    #[serde(deserialize_with = "deserialize_secs")]
    pub tcp_keepalive: Duration,

    /// Ask for gzip/brotli bodies (default: true)
    pub compression: bool,

    /// Enable Hickory DNS for async resolution (default: true)
    pub hickory_dns: bool,

    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 16,
            pool_idle_timeout: Duration::from_secs(90),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            tcp_keepalive: Duration::from_secs(60),
            compression: true,
            hickory_dns: true,
            user_agent: concat!("eod_http/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Larger pool for many concurrent history downloads
    pub fn high_throughput() -> Self {
        Self { pool_max_idle_per_host: 64, pool_idle_timeout: Duration::from_secs(120), ..Default::default() }
    }
}

/// reqwest-backed network session
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_keepalive(Some(config.tcp_keepalive))
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .gzip(config.compression)
            .brotli(config.compression)
            .hickory_dns(config.hickory_dns)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl Transport for HttpClient {
    fn get(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + '_>> {
        Box::pin(async move {
            debug!(path = url.path(), "GET");
            let response = self.client.get(url).send().await?;

            let status = response.status().as_u16();
            // Header names from reqwest are already lower-case
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
                .collect();
            let body = response.bytes().await?;

            Ok(RawResponse { status, headers, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.pool_max_idle_per_host, 16);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.compression);
        assert!(config.user_agent.starts_with("eod_http/"));
    }

    #[test]
    fn test_high_throughput_config() {
        let config = HttpClientConfig::high_throughput();
        assert_eq!(config.pool_max_idle_per_host, 64);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_client_creation() {
        let client = HttpClient::with_config(HttpClientConfig { hickory_dns: false, ..Default::default() }).unwrap();
        assert!(!client.config().hickory_dns);
    }
}
