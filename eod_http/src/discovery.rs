use std::sync::Arc;

use eod_ratelimit::presets;
use eod_ratelimit::QuotaCoordinator;
use eod_ratelimit::RateLimiter;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use url::Url;

use crate::config::EodhdConfig;
use crate::errors::ApiError;
use crate::errors::Result;
use crate::session::SessionManager;
use crate::transport::RawResponse;

pub const ACCOUNT_ENDPOINT: &str = "user";
const MINUTE_LIMIT_HEADER: &str = "x-ratelimit-limit";
const MINUTE_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Limits reported by the account endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountLimits {
    pub daily_limit: u32,
    pub daily_used: u32,
    pub minute_limit: u32,
    pub minute_remaining: u32,
    pub extra_limit: Option<u32>,
}

impl AccountLimits {
    /// Read limits from an account endpoint response
    ///
    /// Daily figures come from the payload (`dailyRateLimit`, `apiRequests`),
    /// minute figures from the rate limit headers.
    pub fn from_response(response: &RawResponse) -> Result<Self> {
        let payload: Value = response.json()?;

        Ok(Self {
            daily_limit: payload_u32(&payload, "dailyRateLimit")?,
            daily_used: payload_u32(&payload, "apiRequests")?,
            minute_limit: header_u32(response, MINUTE_LIMIT_HEADER)?,
            minute_remaining: header_u32(response, MINUTE_REMAINING_HEADER)?,
            extra_limit: payload_u32(&payload, "extraLimit").ok(),
        })
    }

    pub fn daily_remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.daily_used)
    }
}

fn payload_u32(payload: &Value, field: &str) -> Result<u32> {
    let value = payload.get(field).ok_or_else(|| ApiError::InvalidResponse(format!("account payload lacks {field}")))?;

    let parsed = match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    parsed
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .ok_or_else(|| ApiError::InvalidResponse(format!("account field {field} is not a count: {value}")))
}

fn header_u32(response: &RawResponse, name: &str) -> Result<u32> {
    let raw = response.header(name).ok_or_else(|| ApiError::InvalidResponse(format!("account response lacks {name} header")))?;
    raw.trim().parse().map_err(|_| ApiError::InvalidResponse(format!("header {name} is not a count: {raw}")))
}

/// Pools handed to a caller together with the discovery round they came from
#[derive(Debug, Clone)]
pub struct ArmedQuota {
    pub quota: Arc<QuotaCoordinator>,
    pub generation: u64,
}

#[derive(Default)]
struct DiscoveryState {
    quota: Option<Arc<QuotaCoordinator>>,
    initialized: bool,
    generation: u64,
    account_fetches: u64,
}

/// Lazily builds the quota pools, from configuration or the account endpoint
///
/// Initialization runs under one async lock, so concurrent callers observing
/// an uninitialized state wait for a single discovery instead of racing.
#[derive(Default)]
pub struct LimitDiscovery {
    state: Mutex<DiscoveryState>,
}

impl LimitDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the pools if needed and return them
    ///
    /// Idempotent. Only the first call (or the first after [`Self::rearm`])
    /// does any work.
    pub async fn ensure_limits_initialized(&self, config: &EodhdConfig, session: &SessionManager) -> Result<ArmedQuota> {
        let mut state = self.state.lock().await;

        if state.initialized {
            if let Some(quota) = &state.quota {
                return Ok(ArmedQuota { quota: Arc::clone(quota), generation: state.generation });
            }
        }

        let account = if config.limits_are_explicit() {
            None
        } else {
            state.account_fetches += 1;
            Some(fetch_account_limits(config, session).await?)
        };

        let quota = Arc::new(build_quota(config, account.as_ref(), state.quota.as_deref())?);
        info!(generation = state.generation + 1, discovered = account.is_some(), snapshot = ?quota.snapshot(), "Initialized quota pools");

        state.quota = Some(Arc::clone(&quota));
        state.initialized = true;
        state.generation += 1;

        Ok(ArmedQuota { quota, generation: state.generation })
    }

    /// Force the next [`Self::ensure_limits_initialized`] to rediscover
    ///
    /// Only re-arms when `generation` is still current, so a burst of 429s
    /// seen against the same pools triggers one rediscovery.
    pub async fn rearm(&self, generation: u64) -> bool {
        let mut state = self.state.lock().await;
        if !state.initialized || state.generation != generation {
            return false;
        }

        state.initialized = false;
        debug!(generation, "Re-armed limit discovery");
        true
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.initialized
    }

    /// Current pools, if any were built
    pub async fn quota(&self) -> Option<Arc<QuotaCoordinator>> {
        self.state.lock().await.quota.clone()
    }

    /// Number of account endpoint calls made so far
    pub async fn account_fetches(&self) -> u64 {
        self.state.lock().await.account_fetches
    }
}

async fn fetch_account_limits(config: &EodhdConfig, session: &SessionManager) -> Result<AccountLimits> {
    let mut url = Url::parse(&format!("{}/{}", config.base_url.trim_end_matches('/'), ACCOUNT_ENDPOINT))?;
    url.query_pairs_mut().append_pair("api_token", &config.api_key).append_pair("fmt", "json");

    let response = session.transport()?.get(url).await?;
    match response.status {
        429 => return Err(ApiError::Throttled { status: 429, attempts: 1 }),
        status if !response.is_success() => return Err(ApiError::Remote { status, body: response.text() }),
        _ => {}
    }

    let limits = AccountLimits::from_response(&response)?;
    debug!(?limits, "Fetched account limits");
    if let Some(extra) = limits.extra_limit.filter(|e| *e > 0) {
        if config.extra_limit.is_none() {
            info!(extra, "Account reports an extra allowance; set extra_limit to use it");
        }
    }

    Ok(limits)
}

/// Assemble pools from configuration, discovered limits and the pools of the
/// previous round
///
/// Explicitly configured pools and the extra pool carry over from `previous`
/// so that rediscovery never refills them.
fn build_quota(config: &EodhdConfig, account: Option<&AccountLimits>, previous: Option<&QuotaCoordinator>) -> Result<QuotaCoordinator> {
    let daily: Arc<dyn RateLimiter> = match (config.daily_calls_rate_limit, previous, account) {
        (Some(_), Some(prev), _) => Arc::clone(prev.daily()),
        (Some(capacity), None, _) => Arc::new(presets::daily_pool(capacity, config.daily_remaining_limit.unwrap_or(capacity))?),
        (None, _, Some(account)) => Arc::new(presets::daily_pool(
            account.daily_limit,
            config.daily_remaining_limit.unwrap_or_else(|| account.daily_remaining()),
        )?),
        (None, _, None) => return Err(ApiError::InvalidResponse("daily limit neither configured nor discovered".to_string())),
    };

    let minute: Arc<dyn RateLimiter> = match (config.minute_requests_rate_limit, previous, account) {
        (Some(_), Some(prev), _) => Arc::clone(prev.minute()),
        (Some(capacity), None, _) => Arc::new(presets::minute_pool(capacity, config.minute_remaining_limit.unwrap_or(capacity))?),
        (None, _, Some(account)) => Arc::new(presets::minute_pool(
            account.minute_limit,
            config.minute_remaining_limit.unwrap_or(account.minute_remaining),
        )?),
        (None, _, None) => return Err(ApiError::InvalidResponse("minute limit neither configured nor discovered".to_string())),
    };

    let extra = match previous {
        Some(prev) => prev.extra().cloned(),
        None => presets::extra_pool(config.extra_limit.unwrap_or(0)).map(|pool| Arc::new(pool) as Arc<dyn RateLimiter>),
    };

    Ok(QuotaCoordinator::builder()
        .daily_arc(daily)
        .minute_arc(minute)
        .extra_arc(extra)
        .daily_max_wait(config.daily_max_sleep)
        .minute_max_wait(config.minute_max_sleep)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_response() -> RawResponse {
        RawResponse::new(200, r#"{"dailyRateLimit": "200000", "apiRequests": 1000, "extraLimit": "1000"}"#)
            .with_header("x-ratelimit-limit", "2000")
            .with_header("x-ratelimit-remaining", "1100")
    }

    #[test]
    fn test_parse_account_limits() {
        let limits = AccountLimits::from_response(&account_response()).unwrap();

        assert_eq!(
            limits,
            AccountLimits { daily_limit: 200_000, daily_used: 1000, minute_limit: 2000, minute_remaining: 1100, extra_limit: Some(1000) }
        );
        assert_eq!(limits.daily_remaining(), 199_000);
    }

    #[test]
    fn test_missing_header_is_invalid_response() {
        let response = RawResponse::new(200, r#"{"dailyRateLimit": 10, "apiRequests": 1}"#).with_header("x-ratelimit-limit", "10");

        assert!(matches!(AccountLimits::from_response(&response), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_non_numeric_field_is_invalid_response() {
        let response = RawResponse::new(200, r#"{"dailyRateLimit": "lots", "apiRequests": 1}"#)
            .with_header("x-ratelimit-limit", "10")
            .with_header("x-ratelimit-remaining", "10");

        assert!(matches!(AccountLimits::from_response(&response), Err(ApiError::InvalidResponse(_))));
    }

    #[test]
    fn test_used_above_limit_saturates() {
        let limits = AccountLimits { daily_limit: 10, daily_used: 12, minute_limit: 1, minute_remaining: 1, extra_limit: None };
        assert_eq!(limits.daily_remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_from_explicit_config() {
        let config = EodhdConfig::new("demo").with_daily_limit(50_000, Some(4000)).with_minute_limit(100, Some(50)).with_extra_limit(10);

        let quota = build_quota(&config, None, None).unwrap();

        assert_eq!(quota.daily().capacity(), 50_000);
        assert_eq!(quota.daily().initial_tokens(), 4000);
        assert_eq!(quota.minute().capacity(), 100);
        assert_eq!(quota.minute().initial_tokens(), 50);
        assert_eq!(quota.extra().map(|e| e.capacity()), Some(10));
        assert_eq!(quota.extra().map(|e| e.initial_tokens()), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_explicit_config() {
        let account = AccountLimits::from_response(&account_response()).unwrap();
        let config = EodhdConfig::new("demo").with_daily_limit(75_000, None);

        let quota = build_quota(&config, Some(&account), None).unwrap();

        assert_eq!(quota.daily().capacity(), 75_000);
        assert_eq!(quota.daily().initial_tokens(), 75_000);
        assert_eq!(quota.minute().capacity(), 2000);
        assert_eq!(quota.minute().initial_tokens(), 1100);
        // Reported extra allowance is not turned into a pool
        assert!(quota.extra().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuild_keeps_explicit_and_extra_pools() {
        let account = AccountLimits::from_response(&account_response()).unwrap();
        let config = EodhdConfig::new("demo").with_minute_limit(1500, None).with_extra_limit(5);

        let first = build_quota(&config, Some(&account), None).unwrap();
        first.extra().unwrap().try_acquire(3).unwrap();
        first.minute().try_acquire(10).unwrap();

        let second = build_quota(&config, Some(&account), Some(&first)).unwrap();

        assert!(Arc::ptr_eq(first.minute(), second.minute()));
        assert!(Arc::ptr_eq(first.extra().unwrap(), second.extra().unwrap()));
        assert!(!Arc::ptr_eq(first.daily(), second.daily()));
        assert_eq!(second.extra().unwrap().available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_ignores_stale_generation() {
        let config = EodhdConfig::new("demo").with_daily_limit(100, None).with_minute_limit(10, None);
        let session = SessionManager::new(Arc::new(|| -> Result<Arc<dyn crate::transport::Transport>> { Err(ApiError::MissingApiKey) }));
        let discovery = LimitDiscovery::new();

        let first = discovery.ensure_limits_initialized(&config, &session).await.unwrap();
        assert!(discovery.rearm(first.generation).await);
        // Already re-armed, nothing left to do for the same generation
        assert!(!discovery.rearm(first.generation).await);

        let second = discovery.ensure_limits_initialized(&config, &session).await.unwrap();
        assert_eq!(second.generation, first.generation + 1);
        assert!(!discovery.rearm(first.generation).await);
        assert!(discovery.is_initialized().await);
    }
}
