use eod_ratelimit::RateLimitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Quota unavailable: {0}")]
    Quota(#[from] RateLimitError),

    #[error("Throttled by service (HTTP {status}) after {attempts} attempt(s)")]
    Throttled { status: u16, attempts: u32 },

    #[error("Remote error: HTTP {status} - {body}")]
    Remote { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ApiError {
    /// HTTP 429 after retries ran out
    pub fn is_throttled(&self) -> bool {
        matches!(self, ApiError::Throttled { .. })
    }

    /// Local quota refused the call before it was sent
    pub fn is_quota(&self) -> bool {
        matches!(self, ApiError::Quota(_))
    }

    /// Status code of a response the service rejected
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Throttled { status, .. } | ApiError::Remote { status, .. } => Some(*status),
            ApiError::RequestFailed(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
