use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Deserializer;

use crate::client::HttpClientConfig;
use crate::errors::ApiError;
use crate::errors::Result;

pub const EODHD_BASE_URL: &str = "https://eodhd.com/api";
pub const DEMO_API_KEY: &str = "demo";
const ENV_PREFIX: &str = "EODHD";

/// Settings for one EODHD API key
///
/// Pool capacities left as `None` are discovered from the account endpoint
/// on first use. Wait limits are read as seconds (fractions allowed).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EodhdConfig {
    pub api_key: String,
    pub base_url: String,

    /// Daily call budget of the key
    pub daily_calls_rate_limit: Option<u32>,
    /// Calls left today, defaults to the daily budget
    pub daily_remaining_limit: Option<u32>,

    /// Requests allowed per minute
    pub minute_requests_rate_limit: Option<u32>,
    /// Requests left in the current minute, defaults to the minute limit
    pub minute_remaining_limit: Option<u32>,

    /// Non-refilling overflow calls, no pool when absent or zero
    pub extra_limit: Option<u32>,

    #[serde(deserialize_with = "deserialize_secs")]
    pub daily_max_sleep: Duration,
    #[serde(deserialize_with = "deserialize_secs")]
    pub minute_max_sleep: Duration,

    /// Retries after HTTP 429, zero disables retrying
    pub max_retries: u32,
    /// First retry delay, doubled for each further retry
    #[serde(deserialize_with = "deserialize_secs")]
    pub backoff_base: Duration,

    /// Network session settings
    pub http: HttpClientConfig,
}

impl Default for EodhdConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_API_KEY.to_string(),
            base_url: EODHD_BASE_URL.to_string(),
            daily_calls_rate_limit: None,
            daily_remaining_limit: None,
            minute_requests_rate_limit: None,
            minute_remaining_limit: None,
            extra_limit: None,
            daily_max_sleep: Duration::from_secs(3600),
            minute_max_sleep: Duration::from_secs(60),
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
            http: HttpClientConfig::default(),
        }
    }
}

impl EodhdConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Default::default() }
    }

    /// Load settings from a file, overridden by `EODHD_*` environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from(path.as_ref())))
    }

    /// Load settings from `EODHD_*` environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_builder(Config::builder())
    }

    pub(crate) fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)).build()?;
        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ApiError::MissingApiKey);
        }
        if self.base_url.trim().is_empty() {
            return Err(ApiError::InvalidParameter("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether every refilling pool has an explicit capacity
    pub fn limits_are_explicit(&self) -> bool {
        self.daily_calls_rate_limit.is_some() && self.minute_requests_rate_limit.is_some()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_daily_limit(mut self, capacity: u32, remaining: Option<u32>) -> Self {
        self.daily_calls_rate_limit = Some(capacity);
        self.daily_remaining_limit = remaining;
        self
    }

    pub fn with_minute_limit(mut self, capacity: u32, remaining: Option<u32>) -> Self {
        self.minute_requests_rate_limit = Some(capacity);
        self.minute_remaining_limit = remaining;
        self
    }

    pub fn with_extra_limit(mut self, allowance: u32) -> Self {
        self.extra_limit = Some(allowance);
        self
    }

    pub fn with_daily_max_sleep(mut self, wait: Duration) -> Self {
        self.daily_max_sleep = wait;
        self
    }

    pub fn with_minute_max_sleep(mut self, wait: Duration) -> Self {
        self.minute_max_sleep = wait;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_http_config(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }
}

pub(crate) fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
