use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::Result;

/// Response as seen by the dispatcher, before classification
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: HashMap::new(), body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text, lossy, for error reports
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The network session behind a client
///
/// Implemented by [`crate::HttpClient`]; tests plug in scripted transports.
pub trait Transport: Send + Sync {
    /// Issue a GET for `url`, query string included
    fn get(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = RawResponse::new(200, "{}").with_header("X-RateLimit-Limit", "1400");

        assert_eq!(response.header("x-ratelimit-limit"), Some("1400"));
        assert_eq!(response.header("X-RATELIMIT-LIMIT"), Some("1400"));
        assert_eq!(response.header("x-ratelimit-remaining"), None);
    }

    #[test]
    fn test_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(429, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
    }

    #[test]
    fn test_json() {
        let response = RawResponse::new(200, r#"{"close": 100}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["close"], 100);
    }
}
