use std::fmt;
use std::time::Duration;

/// Result type for quota operations
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Errors that can occur while drawing tokens from a quota pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The pool can never satisfy the draw: the cost exceeds its capacity,
    /// or the pool does not refill and holds fewer tokens than requested
    NoTokensAvailable { cost: u32, available: u32, capacity: u32 },

    /// The pool would satisfy the draw, but not within the allowed wait
    MaxSleepExceeded { cost: u32, wait: Duration, max_wait: Duration },

    /// Invalid configuration
    InvalidConfig(&'static str),
}

impl RateLimitError {
    /// True for the failure that may be rescued by waiting longer
    pub fn is_wait_exceeded(&self) -> bool {
        matches!(self, RateLimitError::MaxSleepExceeded { .. })
    }

    /// True when the pool cannot hand out the requested tokens at all
    pub fn is_no_tokens(&self) -> bool {
        matches!(self, RateLimitError::NoTokensAvailable { .. })
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::NoTokensAvailable { cost, available, capacity } => {
                write!(f, "No tokens available: cost {} with {} of {} tokens left", cost, available, capacity)
            }
            RateLimitError::MaxSleepExceeded { cost, wait, max_wait } => {
                write!(f, "Max sleep exceeded: cost {} needs {:?}, allowed {:?}", cost, wait, max_wait)
            }
            RateLimitError::InvalidConfig(msg) => write!(f, "Invalid quota pool configuration: {}", msg),
        }
    }
}

impl std::error::Error for RateLimitError {}
