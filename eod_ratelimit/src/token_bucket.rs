use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::error::RateLimitError;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::time::duration_to_nanos;
use crate::time::secs_to_nanos;
use crate::time::TimeSource;

/// Token bucket quota pool using lock-free atomic operations
///
/// Tokens refill continuously at `refill_amount` per `refill_period` up to the
/// bucket's capacity, and every call draws its cost from the bucket. A bucket
/// built without a refill never regrows once drained.
pub struct TokenBucket {
    /// Current number of available tokens (scaled by TOKEN_SCALE)
    tokens: AtomicU64,

    /// Last refill timestamp in nanoseconds
    last_refill: AtomicU64,

    /// Maximum number of tokens
    capacity: u32,

    /// Token level at construction and after `reset`
    initial_tokens: u32,

    /// Scaled tokens added per second, zero for a non-refilling bucket
    refill_per_sec: u64,

    /// Time source for consistent time measurements
    time_source: TimeSource,
}

// Fixed-point scale so that slow refills (a daily pool) still accrue
const TOKEN_SCALE: u64 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

impl TokenBucket {
    /// Create a new token bucket
    ///
    /// `initial_tokens` is clamped to `capacity`. A zero `refill_period` or
    /// `refill_amount` yields a bucket that never refills.
    pub fn new(capacity: u32, initial_tokens: u32, refill_amount: u32, refill_period: Duration) -> Self {
        let time_source = TimeSource::new();
        let now = time_source.now_nanos();
        let initial_tokens = initial_tokens.min(capacity);

        let period_nanos = duration_to_nanos(refill_period);
        let refill_per_sec = if period_nanos == 0 || refill_amount == 0 {
            0
        } else {
            let scaled = refill_amount as u128 * TOKEN_SCALE as u128 * NANOS_PER_SEC / period_nanos as u128;
            u64::try_from(scaled).unwrap_or(u64::MAX).max(1)
        };

        Self {
            tokens: AtomicU64::new(initial_tokens as u64 * TOKEN_SCALE),
            last_refill: AtomicU64::new(now),
            capacity,
            initial_tokens,
            refill_per_sec,
            time_source,
        }
    }

    /// Create a builder for configuring a token bucket
    pub fn builder() -> TokenBucketBuilder {
        TokenBucketBuilder::new()
    }

    /// Whether the bucket regains tokens over time
    pub fn refills(&self) -> bool {
        self.refill_per_sec > 0
    }

    /// Refill tokens based on elapsed time since last refill
    #[inline(always)]
    fn refill(&self) {
        if self.refill_per_sec == 0 {
            return;
        }

        let now = self.time_source.now_nanos();
        let last = self.last_refill.load(Ordering::Acquire);

        let elapsed = now.saturating_sub(last);
        if elapsed == 0 {
            return;
        }

        let to_add = elapsed as u128 * self.refill_per_sec as u128 / NANOS_PER_SEC;
        if to_add == 0 {
            return;
        }
        let to_add = u64::try_from(to_add).unwrap_or(u64::MAX);

        // Whoever moves the timestamp owns the right to add tokens
        if self.last_refill.compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed).is_ok() {
            let capacity_scaled = self.capacity as u64 * TOKEN_SCALE;
            let _ = self.tokens.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let next = current.saturating_add(to_add).min(capacity_scaled);
                (next != current).then_some(next)
            });
        }
    }

    /// Draw `cost` tokens, or report how long until they would be available
    ///
    /// `Err(None)` means the bucket will never hold enough tokens.
    fn draw(&self, cost: u32) -> std::result::Result<(), Option<Duration>> {
        if cost > self.capacity {
            return Err(None);
        }

        self.refill();

        let required = cost as u64 * TOKEN_SCALE;
        let mut observed = 0;
        let drawn = self.tokens.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            observed = current;
            current.checked_sub(required)
        });

        match drawn {
            Ok(_) => Ok(()),
            Err(_) if self.refill_per_sec == 0 => Err(None),
            Err(_) => {
                let deficit = (required - observed) as u128;
                let nanos = (deficit * NANOS_PER_SEC).div_ceil(self.refill_per_sec as u128);
                Err(Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))))
            }
        }
    }

    fn no_tokens(&self, cost: u32) -> RateLimitError {
        RateLimitError::NoTokensAvailable { cost, available: self.available(), capacity: self.capacity }
    }
}

impl RateLimiter for TokenBucket {
    #[inline]
    fn try_acquire(&self, cost: u32) -> Result<()> {
        if cost == 0 {
            return Ok(());
        }

        match self.draw(cost) {
            Ok(()) => Ok(()),
            Err(None) => Err(self.no_tokens(cost)),
            Err(Some(wait)) => Err(RateLimitError::MaxSleepExceeded { cost, wait, max_wait: Duration::ZERO }),
        }
    }

    fn acquire(&self, cost: u32, max_wait: Duration) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if cost == 0 {
                return Ok(());
            }

            let start = tokio::time::Instant::now();

            loop {
                let wait = match self.draw(cost) {
                    Ok(()) => return Ok(()),
                    Err(None) => return Err(self.no_tokens(cost)),
                    Err(Some(wait)) => wait,
                };

                // Another acquirer may have taken the refilled tokens, so the
                // budget shrinks with every round
                let remaining = max_wait.saturating_sub(start.elapsed());
                if wait > remaining {
                    return Err(RateLimitError::MaxSleepExceeded { cost, wait, max_wait });
                }

                tokio::time::sleep(wait).await;
            }
        })
    }

    fn available(&self) -> u32 {
        self.refill();
        (self.tokens.load(Ordering::Acquire) / TOKEN_SCALE) as u32
    }

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn initial_tokens(&self) -> u32 {
        self.initial_tokens
    }

    fn reset(&self) {
        let now = self.time_source.now_nanos();
        self.tokens.store(self.initial_tokens as u64 * TOKEN_SCALE, Ordering::Release);
        self.last_refill.store(now, Ordering::Release);
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("capacity", &self.capacity)
            .field("initial_tokens", &self.initial_tokens)
            .field("available", &(self.tokens.load(Ordering::Relaxed) / TOKEN_SCALE))
            .field("refills", &self.refills())
            .finish()
    }
}

/// Builder for configuring a token bucket
pub struct TokenBucketBuilder {
    capacity: Option<u32>,
    initial_tokens: Option<u32>,
    refill: Option<(u32, Duration)>,
}

impl TokenBucketBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self { capacity: None, initial_tokens: None, refill: None }
    }

    /// Set the bucket capacity (max tokens)
    pub fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the starting level, defaults to the capacity
    pub fn initial_tokens(mut self, tokens: u32) -> Self {
        self.initial_tokens = Some(tokens);
        self
    }

    /// Refill `amount` tokens every `period`
    pub fn refill(mut self, amount: u32, period: Duration) -> Self {
        self.refill = Some((amount, period));
        self
    }

    /// Refill `amount` tokens per minute
    pub fn refill_per_minute(self, amount: u32) -> Self {
        self.refill(amount, Duration::from_secs(60))
    }

    /// Refill `amount` tokens per day
    pub fn refill_per_day(self, amount: u32) -> Self {
        self.refill(amount, Duration::from_nanos(secs_to_nanos(86_400)))
    }

    /// Never refill
    pub fn no_refill(mut self) -> Self {
        self.refill = None;
        self
    }

    /// Build the token bucket
    pub fn build(self) -> Result<TokenBucket> {
        let capacity = self.capacity.ok_or(RateLimitError::InvalidConfig("capacity must be set"))?;
        let initial_tokens = self.initial_tokens.unwrap_or(capacity);
        if initial_tokens > capacity {
            return Err(RateLimitError::InvalidConfig("initial tokens exceed capacity"));
        }
        let (amount, period) = self.refill.unwrap_or((0, Duration::ZERO));
        Ok(TokenBucket::new(capacity, initial_tokens, amount, period))
    }
}

impl Default for TokenBucketBuilder {
    fn default() -> Self {
        Self::new()
    }
}
