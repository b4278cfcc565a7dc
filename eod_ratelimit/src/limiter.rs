use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::Result;

/// Core trait for a quota pool
pub trait RateLimiter: Send + Sync {
    /// Try to draw `cost` tokens without waiting
    fn try_acquire(&self, cost: u32) -> Result<()>;

    /// Wait up to `max_wait` for `cost` tokens, then draw them
    ///
    /// Fails immediately (without sleeping) when the pool cannot satisfy the
    /// draw within `max_wait`.
    fn acquire(&self, cost: u32, max_wait: Duration) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Get the number of currently available tokens
    fn available(&self) -> u32;

    /// Get the maximum capacity
    fn capacity(&self) -> u32;

    /// Token level the pool started with
    fn initial_tokens(&self) -> u32;

    /// Reset the pool to its initial level
    fn reset(&self);
}
