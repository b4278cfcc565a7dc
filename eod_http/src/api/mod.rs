//! Endpoint adapters over the quota-aware dispatcher
//!
//! Each adapter turns typed arguments into a [`RequestDescriptor`] and hands
//! it to the shared [`EodhdClient`]. All adapters obtained from one
//! [`EodhdApi`] share the same pools and network session.

pub mod calendar;
pub mod corporate;
pub mod exchanges;
pub mod historical;
pub mod user;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use time::macros::format_description;
use time::Date;
use tracing::debug;

pub use calendar::Earnings;
pub use calendar::EarningsApi;
pub use calendar::Ipos;
pub use calendar::IposApi;
pub use corporate::Dividends;
pub use corporate::DividendsApi;
pub use corporate::Splits;
pub use corporate::SplitsApi;
pub use exchanges::ExchangeSymbolList;
pub use exchanges::ExchangeSymbolListApi;
pub use exchanges::Exchanges;
pub use exchanges::ExchangesApi;
pub use exchanges::SymbolType;
pub use historical::EodHistorical;
pub use historical::EodHistoricalApi;
pub use historical::IntradayHistorical;
pub use historical::IntradayHistoricalApi;
pub use user::UserApi;
pub use user::UserInfo;

use crate::config::EodhdConfig;
use crate::context::ApiContext;
use crate::dispatcher::RequestDescriptor;
use crate::errors::ApiError;
use crate::errors::Result;
use crate::session::SessionGuard;

/// A typed call that can be turned into a request
pub trait Endpoint {
    fn build_request(&self) -> Result<RequestDescriptor>;

    /// Post-process the decoded payload, identity by default
    fn reshape(&self, payload: Value) -> Value {
        payload
    }
}

/// Cheap-to-clone handle over one [`ApiContext`]
#[derive(Debug, Clone)]
pub struct EodhdClient {
    ctx: Arc<ApiContext>,
}

impl EodhdClient {
    /// Client over a reqwest session
    pub fn new(config: EodhdConfig) -> Result<Self> {
        Ok(Self::from_context(Arc::new(ApiContext::new(config)?)))
    }

    pub fn from_context(ctx: Arc<ApiContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<ApiContext> {
        &self.ctx
    }

    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value> {
        self.ctx.dispatch(request).await
    }

    /// Build, dispatch and reshape one endpoint call
    pub async fn execute<E: Endpoint + ?Sized>(&self, endpoint: &E) -> Result<Value> {
        let request = endpoint.build_request()?;
        let payload = self.dispatch(&request).await?;
        Ok(endpoint.reshape(payload))
    }

    /// Hold the network session open until the guard is dropped
    pub fn scope(&self) -> Result<SessionGuard> {
        self.ctx.session().enter()
    }
}

/// Identifies one sub-client in the [`EodhdApi`] registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    User,
    EodHistorical,
    IntradayHistorical,
    Dividends,
    Splits,
    Exchanges,
    ExchangeSymbolList,
    Earnings,
    Ipos,
}

/// A sub-client that can live in the [`EodhdApi`] registry
pub trait SubApi: Send + Sync + 'static {
    const KIND: ApiKind;

    fn new(client: EodhdClient) -> Self;
}

/// Entry point grouping every sub-client over one context
///
/// Sub-clients are built on first access and cached, so repeated lookups
/// return the same instance.
pub struct EodhdApi {
    client: EodhdClient,
    apis: Mutex<HashMap<ApiKind, Arc<dyn Any + Send + Sync>>>,
}

impl EodhdApi {
    pub fn new(config: EodhdConfig) -> Result<Self> {
        Ok(Self::from_client(EodhdClient::new(config)?))
    }

    pub fn from_client(client: EodhdClient) -> Self {
        Self { client, apis: Mutex::new(HashMap::new()) }
    }

    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    /// Hold the shared network session open until the guard is dropped
    pub fn scope(&self) -> Result<SessionGuard> {
        self.client.scope()
    }

    /// Cached sub-client of type `T`, built on first lookup
    pub fn get<T: SubApi>(&self) -> Arc<T> {
        let mut apis = self.apis.lock();

        if let Some(api) = apis.get(&T::KIND).and_then(|api| Arc::clone(api).downcast::<T>().ok()) {
            return api;
        }

        debug!(kind = ?T::KIND, "Creating sub-client");
        let api = Arc::new(T::new(self.client.clone()));
        apis.insert(T::KIND, Arc::clone(&api) as Arc<dyn Any + Send + Sync>);
        api
    }

    pub fn user_api(&self) -> Arc<UserApi> {
        self.get()
    }

    pub fn eod_historical_api(&self) -> Arc<EodHistoricalApi> {
        self.get()
    }

    pub fn intraday_historical_api(&self) -> Arc<IntradayHistoricalApi> {
        self.get()
    }

    pub fn dividends_api(&self) -> Arc<DividendsApi> {
        self.get()
    }

    pub fn splits_api(&self) -> Arc<SplitsApi> {
        self.get()
    }

    pub fn exchanges_api(&self) -> Arc<ExchangesApi> {
        self.get()
    }

    pub fn exchange_symbol_list_api(&self) -> Arc<ExchangeSymbolListApi> {
        self.get()
    }

    pub fn earnings_api(&self) -> Arc<EarningsApi> {
        self.get()
    }

    pub fn ipos_api(&self) -> Arc<IposApi> {
        self.get()
    }
}

/// `YYYY-MM-DD`, as every date parameter of the service expects
pub(crate) fn format_date(date: Date) -> Result<String> {
    date.format(format_description!("[year]-[month]-[day]")).map_err(|err| ApiError::InvalidParameter(format!("unformattable date {date}: {err}")))
}

/// Append optional `from`/`to` date bounds
pub(crate) fn with_date_range(mut request: RequestDescriptor, from: Option<Date>, to: Option<Date>) -> Result<RequestDescriptor> {
    if let Some(from) = from {
        request = request.param("from", format_date(from)?);
    }
    if let Some(to) = to {
        request = request.param("to", format_date(to)?);
    }
    Ok(request)
}

/// Take the array under `key`, or an empty array when absent
pub(crate) fn unwrap_list(payload: Value, key: &str) -> Value {
    match payload {
        Value::Object(mut fields) => match fields.remove(key) {
            Some(list @ Value::Array(_)) => list,
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    }
}
