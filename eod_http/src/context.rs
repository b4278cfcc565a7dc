use std::sync::Arc;

use serde_json::Value;

use crate::client::HttpClient;
use crate::config::EodhdConfig;
use crate::discovery::ArmedQuota;
use crate::discovery::LimitDiscovery;
use crate::dispatcher;
use crate::dispatcher::RequestDescriptor;
use crate::dispatcher::Sleeper;
use crate::dispatcher::TokioSleeper;
use crate::errors::Result;
use crate::session::SessionManager;
use crate::session::TransportFactory;
use crate::transport::Transport;

/// Runtime state behind every client built from one configuration
///
/// Holds the quota pools (via limit discovery), the shared network session
/// and the retry sleeper. Clients share a context through `Arc`.
pub struct ApiContext {
    config: EodhdConfig,
    limits: LimitDiscovery,
    session: Arc<SessionManager>,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiContext {
    /// Context over a reqwest session
    pub fn new(config: EodhdConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: EodhdConfig) -> ApiContextBuilder {
        ApiContextBuilder::new(config)
    }

    pub fn config(&self) -> &EodhdConfig {
        &self.config
    }

    pub fn limits(&self) -> &LimitDiscovery {
        &self.limits
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    /// Build the quota pools on first use, discovering missing limits
    pub async fn ensure_limits_initialized(&self) -> Result<ArmedQuota> {
        self.limits.ensure_limits_initialized(&self.config, &self.session).await
    }

    /// Send one call through the quota pools, retrying on HTTP 429
    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value> {
        dispatcher::dispatch(self, request).await
    }
}

impl std::fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiContext")
            .field("base_url", &self.config.base_url)
            .field("session_refs", &self.session.ref_count())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ApiContext`]
pub struct ApiContextBuilder {
    config: EodhdConfig,
    transport: Option<Arc<dyn Transport>>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl ApiContextBuilder {
    pub fn new(config: EodhdConfig) -> Self {
        Self { config, transport: None, sleeper: None }
    }

    /// Serve every session from `transport` instead of opening reqwest clients
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn build(self) -> Result<ApiContext> {
        self.config.validate()?;

        let factory: TransportFactory = match self.transport {
            Some(transport) => Arc::new(move || -> Result<Arc<dyn Transport>> { Ok(Arc::clone(&transport)) }),
            None => {
                let http = self.config.http.clone();
                Arc::new(move || -> Result<Arc<dyn Transport>> { Ok(Arc::new(HttpClient::with_config(http.clone())?)) })
            }
        };

        Ok(ApiContext {
            config: self.config,
            limits: LimitDiscovery::new(),
            session: Arc::new(SessionManager::new(factory)),
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;

    #[test]
    fn test_build_rejects_missing_key() {
        let result = ApiContext::new(EodhdConfig::new(""));
        assert!(matches!(result, Err(ApiError::MissingApiKey)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_limits_need_no_session() {
        let config = EodhdConfig::new("demo").with_daily_limit(100, None).with_minute_limit(10, Some(5));
        let ctx = ApiContext::new(config).unwrap();

        let armed = ctx.ensure_limits_initialized().await.unwrap();
        let again = ctx.ensure_limits_initialized().await.unwrap();

        assert!(Arc::ptr_eq(&armed.quota, &again.quota));
        assert_eq!(armed.generation, 1);
        assert_eq!(armed.quota.snapshot().minute_available, 5);
        assert_eq!(ctx.limits().account_fetches().await, 0);
        assert!(!ctx.session().is_open());
    }
}
