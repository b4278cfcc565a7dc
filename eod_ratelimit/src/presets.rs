//! Pool presets matching the EODHD account limits
//!
//! EODHD enforces two refilling limits on every API key plus an optional
//! one-off allowance:
//! - **Daily calls**: the account's daily call budget, refilled over a day
//! - **Minute requests**: requests per minute, refilled over a minute
//! - **Extra calls**: purchased overflow calls that never come back
//!
//! Reference: https://eodhd.com/financial-apis/api-limits

use crate::error::Result;
use crate::TokenBucket;

/// Daily pool holding `remaining` of `capacity` calls
pub fn daily_pool(capacity: u32, remaining: u32) -> Result<TokenBucket> {
    TokenBucket::builder().capacity(capacity).initial_tokens(remaining.min(capacity)).refill_per_day(capacity).build()
}

/// Per-minute pool holding `remaining` of `capacity` requests
pub fn minute_pool(capacity: u32, remaining: u32) -> Result<TokenBucket> {
    TokenBucket::builder().capacity(capacity).initial_tokens(remaining.min(capacity)).refill_per_minute(capacity).build()
}

/// Non-refilling overflow pool, `None` when there is no allowance
pub fn extra_pool(allowance: u32) -> Option<TokenBucket> {
    (allowance > 0).then(|| TokenBucket::new(allowance, allowance, 0, std::time::Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateLimiter;

    #[test]
    fn test_daily_pool() {
        let pool = daily_pool(100_000, 99_000).unwrap();

        assert_eq!(pool.capacity(), 100_000);
        assert_eq!(pool.initial_tokens(), 99_000);
        assert!(pool.refills());
    }

    #[test]
    fn test_remaining_clamped_to_capacity() {
        let pool = minute_pool(100, 500).unwrap();
        assert_eq!(pool.initial_tokens(), 100);
    }

    #[test]
    fn test_minute_pool() {
        let pool = minute_pool(1400, 100).unwrap();

        assert_eq!(pool.capacity(), 1400);
        assert_eq!(pool.available(), 100);
        assert!(pool.try_acquire(100).is_ok());
    }

    #[test]
    fn test_extra_pool() {
        let pool = extra_pool(10).unwrap();

        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.initial_tokens(), 10);
        assert!(!pool.refills());
    }

    #[test]
    fn test_no_extra_pool_without_allowance() {
        assert!(extra_pool(0).is_none());
    }
}
