use std::time::Duration;

use tokio::time::Instant;

/// Time tracking for quota pools
///
/// Built on the tokio clock so that paused-time tests drive refills.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TimeSource {
    /// Epoch for relative time measurements
    epoch: Instant,
}

impl TimeSource {
    /// Create a new time source with current time as epoch
    #[inline(always)]
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Get current time in nanoseconds since epoch
    #[inline(always)]
    pub fn now_nanos(&self) -> u64 {
        duration_to_nanos(self.epoch.elapsed())
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert seconds to nanoseconds
#[inline(always)]
pub(crate) const fn secs_to_nanos(secs: u64) -> u64 {
    secs * 1_000_000_000
}

/// Convert duration to nanoseconds, saturating at `u64::MAX`
#[inline(always)]
pub(crate) fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
