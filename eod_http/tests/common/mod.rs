//! Scripted transport and recording sleeper shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use eod_http::ApiContext;
use eod_http::EodhdConfig;
use eod_http::RawResponse;
use eod_http::Result;
use eod_http::Sleeper;
use eod_http::Transport;
use parking_lot::Mutex;
use url::Url;

pub const BASE_URL: &str = "https://eodhd.test/api";
pub const API_KEY: &str = "test-key";

/// Replays canned responses per endpoint
///
/// Responses queued for an endpoint are served in order; the last one keeps
/// being served once the queue is down to it. Unknown endpoints get a 404.
/// The response is picked when the request is sent and delivered after
/// `latency`.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<RawResponse>>>,
    requests: Mutex<Vec<Url>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self { latency, ..Self::default() })
    }

    pub fn route(&self, endpoint: &str, responses: Vec<RawResponse>) {
        self.routes.lock().insert(endpoint.trim_matches('/').to_string(), responses.into());
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().clone()
    }

    /// Requests sent to `endpoint`
    pub fn hits(&self, endpoint: &str) -> usize {
        self.requests.lock().iter().filter(|url| endpoint_of(url) == endpoint).count()
    }
}

fn endpoint_of(url: &Url) -> String {
    url.path().trim_start_matches("/api/").to_string()
}

impl Transport for ScriptedTransport {
    fn get(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + '_>> {
        let endpoint = endpoint_of(&url);
        self.requests.lock().push(url);

        let response = match self.routes.lock().get_mut(&endpoint) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };

        let latency = self.latency;
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(response.unwrap_or_else(|| RawResponse::new(404, "Ticker Not Found.")))
        })
    }
}

/// Records backoff sleeps instead of waiting
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleeps.lock().push(duration);
        Box::pin(std::future::ready(()))
    }
}

pub fn ok(body: &'static str) -> RawResponse {
    RawResponse::new(200, body)
}

pub fn throttled() -> RawResponse {
    RawResponse::new(429, "Too Many Requests")
}

/// Account endpoint response
pub fn account(daily_limit: u32, used: u32, minute_limit: u32, minute_remaining: u32) -> RawResponse {
    let body = format!(r#"{{"name": "Test User", "apiRequests": {used}, "dailyRateLimit": {daily_limit}, "extraLimit": 0}}"#);
    RawResponse::new(200, body)
        .with_header("X-RateLimit-Limit", minute_limit.to_string())
        .with_header("X-RateLimit-Remaining", minute_remaining.to_string())
}

pub fn config() -> EodhdConfig {
    EodhdConfig::new(API_KEY).with_base_url(BASE_URL).with_max_retries(3).with_backoff_base(Duration::from_secs(1))
}

/// Explicit pools large enough to stay out of the way
pub fn explicit_config() -> EodhdConfig {
    config().with_daily_limit(100_000, None).with_minute_limit(1_000, None)
}

pub fn context(config: EodhdConfig, transport: &Arc<ScriptedTransport>, sleeper: &Arc<RecordingSleeper>) -> Arc<ApiContext> {
    let context = ApiContext::builder(config)
        .transport(Arc::clone(transport) as Arc<dyn Transport>)
        .sleeper(Arc::clone(sleeper) as Arc<dyn Sleeper>)
        .build()
        .expect("valid test config");
    Arc::new(context)
}
