use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;

use crate::error::RateLimitError;
use crate::error::Result;
use crate::limiter::RateLimiter;

/// Pool that covered the daily share of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawSource {
    Daily,
    Extra,
}

/// Point-in-time view of every pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSnapshot {
    pub daily_available: u32,
    pub daily_capacity: u32,
    pub minute_available: u32,
    pub minute_capacity: u32,
    pub extra_available: Option<u32>,
}

/// Coordinator for the daily, minute and extra pools
///
/// EODHD enforces a daily call budget and a per-minute request limit on the
/// same key. Every call must clear both:
/// - the daily pool, or the extra pool when the daily pool cannot serve the
///   call within its wait budget
/// - the minute pool, which has no fallback
///
/// Draws are not refunded when a later pool rejects the call.
pub struct QuotaCoordinator {
    daily: Arc<dyn RateLimiter>,
    minute: Arc<dyn RateLimiter>,
    extra: Option<Arc<dyn RateLimiter>>,
    daily_max_wait: Duration,
    minute_max_wait: Duration,
}

impl QuotaCoordinator {
    /// Create a new coordinator builder
    pub fn builder() -> QuotaCoordinatorBuilder {
        QuotaCoordinatorBuilder::new()
    }

    /// Draw `cost` tokens for one call
    pub async fn acquire(&self, cost: u32) -> Result<DrawSource> {
        let source = match self.daily.acquire(cost, self.daily_max_wait).await {
            Ok(()) => DrawSource::Daily,
            Err(daily_err) => self.fall_back_to_extra(cost, daily_err)?,
        };

        // The extra allowance only backs the daily ceiling
        self.minute.acquire(cost, self.minute_max_wait).await?;

        Ok(source)
    }

    fn fall_back_to_extra(&self, cost: u32, daily_err: RateLimitError) -> Result<DrawSource> {
        let Some(extra) = &self.extra else {
            return Err(daily_err);
        };

        match extra.try_acquire(cost) {
            Ok(()) => {
                info!(cost, remaining = extra.available(), reason = %daily_err, "Daily quota unavailable, drew from extra allowance");
                Ok(DrawSource::Extra)
            }
            Err(extra_err) => {
                debug!(cost, reason = %extra_err, "Extra allowance cannot cover call");
                Err(daily_err)
            }
        }
    }

    pub fn daily(&self) -> &Arc<dyn RateLimiter> {
        &self.daily
    }

    pub fn minute(&self) -> &Arc<dyn RateLimiter> {
        &self.minute
    }

    pub fn extra(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.extra.as_ref()
    }

    pub fn daily_max_wait(&self) -> Duration {
        self.daily_max_wait
    }

    pub fn minute_max_wait(&self) -> Duration {
        self.minute_max_wait
    }

    /// Current levels of all pools
    pub fn snapshot(&self) -> QuotaSnapshot {
        QuotaSnapshot {
            daily_available: self.daily.available(),
            daily_capacity: self.daily.capacity(),
            minute_available: self.minute.available(),
            minute_capacity: self.minute.capacity(),
            extra_available: self.extra.as_ref().map(|e| e.available()),
        }
    }
}

impl std::fmt::Debug for QuotaCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaCoordinator")
            .field("snapshot", &self.snapshot())
            .field("daily_max_wait", &self.daily_max_wait)
            .field("minute_max_wait", &self.minute_max_wait)
            .finish()
    }
}

/// Builder for creating a quota coordinator
pub struct QuotaCoordinatorBuilder {
    daily: Option<Arc<dyn RateLimiter>>,
    minute: Option<Arc<dyn RateLimiter>>,
    extra: Option<Arc<dyn RateLimiter>>,
    daily_max_wait: Duration,
    minute_max_wait: Duration,
}

impl QuotaCoordinatorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { daily: None, minute: None, extra: None, daily_max_wait: Duration::ZERO, minute_max_wait: Duration::ZERO }
    }

    pub fn daily<L: RateLimiter + 'static>(self, pool: L) -> Self {
        self.daily_arc(Arc::new(pool))
    }

    pub fn daily_arc(mut self, pool: Arc<dyn RateLimiter>) -> Self {
        self.daily = Some(pool);
        self
    }

    pub fn minute<L: RateLimiter + 'static>(self, pool: L) -> Self {
        self.minute_arc(Arc::new(pool))
    }

    pub fn minute_arc(mut self, pool: Arc<dyn RateLimiter>) -> Self {
        self.minute = Some(pool);
        self
    }

    pub fn extra<L: RateLimiter + 'static>(self, pool: L) -> Self {
        self.extra_arc(Some(Arc::new(pool)))
    }

    pub fn extra_arc(mut self, pool: Option<Arc<dyn RateLimiter>>) -> Self {
        self.extra = pool;
        self
    }

    /// Longest wait allowed for the daily pool
    pub fn daily_max_wait(mut self, wait: Duration) -> Self {
        self.daily_max_wait = wait;
        self
    }

    /// Longest wait allowed for the minute pool
    pub fn minute_max_wait(mut self, wait: Duration) -> Self {
        self.minute_max_wait = wait;
        self
    }

    /// Build the coordinator, daily and minute pools are required
    pub fn build(self) -> Result<QuotaCoordinator> {
        Ok(QuotaCoordinator {
            daily: self.daily.ok_or(RateLimitError::InvalidConfig("daily pool must be set"))?,
            minute: self.minute.ok_or(RateLimitError::InvalidConfig("minute pool must be set"))?,
            extra: self.extra,
            daily_max_wait: self.daily_max_wait,
            minute_max_wait: self.minute_max_wait,
        })
    }
}

impl Default for QuotaCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
