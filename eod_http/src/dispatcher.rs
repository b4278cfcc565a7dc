use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use eod_ratelimit::get_endpoint_cost;
use serde_json::Value;
use tracing::debug;
use tracing::warn;
use url::Url;

use crate::context::ApiContext;
use crate::errors::ApiError;
use crate::errors::Result;

const RESERVED_PARAMS: [&str; 2] = ["api_token", "fmt"];

/// One logical API call: endpoint path, query parameters and optional cost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
    /// Overrides the cost table when set
    pub cost: Option<u32>,
}

impl RequestDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), params: Vec::new(), cost: None }
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Add the parameter only when a value is present
    pub fn param_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Explicit cost, else the cost table entry for the endpoint
    pub fn resolved_cost(&self) -> u32 {
        self.cost.unwrap_or_else(|| get_endpoint_cost(&self.endpoint))
    }

    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Full request URL: `api_token` and `fmt=json` first, then the caller's
/// parameters in order
pub fn build_url(base_url: &str, api_key: &str, request: &RequestDescriptor) -> Result<Url> {
    let endpoint = request.endpoint.trim_matches('/');
    if endpoint.is_empty() {
        return Err(ApiError::InvalidParameter("endpoint must not be empty".to_string()));
    }

    let mut url = Url::parse(&format!("{}/{}", base_url.trim_end_matches('/'), endpoint))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("api_token", api_key).append_pair("fmt", "json");
        for (name, value) in request.params.iter().filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str())) {
            query.append_pair(name, value);
        }
    }

    Ok(url)
}

/// Suspends the dispatcher between 429 retries
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Exponential backoff after HTTP 429: `base`, `2 * base`, `4 * base`, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max_retries: u32,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max_retries: u32) -> Self {
        Self { base, max_retries, attempt: 0 }
    }

    pub fn should_retry(&self) -> bool {
        self.attempt < self.max_retries
    }

    /// Retries taken so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next retry, `None` once retries are spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        self.attempt += 1;
        Some(self.base.checked_mul(factor).unwrap_or(Duration::MAX))
    }
}

/// Admit, send and classify one call, retrying on HTTP 429
///
/// Every attempt goes through limit discovery and the quota pools again, so
/// a retry after rediscovery draws from the fresh pools. A 429 from the
/// account endpoint during rediscovery spends a retry like any other 429.
pub(crate) async fn dispatch(ctx: &ApiContext, request: &RequestDescriptor) -> Result<Value> {
    let config = ctx.config();
    let url = build_url(&config.base_url, &config.api_key, request)?;
    let cost = request.resolved_cost();
    let mut backoff = Backoff::new(config.backoff_base, config.max_retries);

    loop {
        match ctx.ensure_limits_initialized().await {
            Ok(armed) => {
                let source = armed.quota.acquire(cost).await?;
                debug!(endpoint = %request.endpoint, cost, ?source, attempt = backoff.attempt(), "Sending request");

                let response = ctx.session().transport()?.get(url.clone()).await?;
                match response.status {
                    429 => {
                        ctx.limits().rearm(armed.generation).await;
                    }
                    _ if response.is_success() => return response.json(),
                    status => return Err(ApiError::Remote { status, body: response.text() }),
                }
            }
            // Account endpoint throttled too; pools stay unarmed for the next attempt
            Err(ApiError::Throttled { .. }) => {
                debug!(endpoint = %request.endpoint, attempt = backoff.attempt(), "Limit discovery throttled");
            }
            Err(err) => return Err(err),
        }

        let Some(delay) = backoff.next_delay() else {
            warn!(endpoint = %request.endpoint, attempts = backoff.attempt() + 1, "Throttled, retries exhausted");
            return Err(ApiError::Throttled { status: 429, attempts: backoff.attempt() + 1 });
        };

        warn!(endpoint = %request.endpoint, retry = backoff.attempt(), ?delay, "Throttled, backing off");
        ctx.sleeper().sleep(delay).await;
    }
}
