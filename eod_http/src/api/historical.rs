use serde_json::Value;
use time::Date;

use super::with_date_range;
use super::ApiKind;
use super::EodhdClient;
use super::Endpoint;
use super::SubApi;
use crate::dispatcher::RequestDescriptor;
use crate::errors::Result;
use crate::validation::validate_normalize_symbol;
use crate::validation::Interval;
use crate::validation::Order;
use crate::validation::Period;

/// End-of-day bars for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EodHistorical {
    pub symbol: String,
    pub period: Period,
    pub order: Order,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl EodHistorical {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), period: Period::default(), order: Order::default(), from: None, to: None }
    }

    pub fn period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn from_date(mut self, from: Date) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to_date(mut self, to: Date) -> Self {
        self.to = Some(to);
        self
    }
}

impl Endpoint for EodHistorical {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let symbol = validate_normalize_symbol(&self.symbol)?;
        let request = RequestDescriptor::new(format!("eod/{symbol}")).param("period", self.period).param("order", self.order);
        with_date_range(request, self.from, self.to)
    }
}

/// Intraday bars for one symbol, charged five calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradayHistorical {
    pub symbol: String,
    pub interval: Interval,
    pub from: Option<Date>,
    pub to: Option<Date>,
    /// Ask for date and time in separate fields
    pub split_dt: bool,
}

impl IntradayHistorical {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), interval: Interval::default(), from: None, to: None, split_dt: false }
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn from_date(mut self, from: Date) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to_date(mut self, to: Date) -> Self {
        self.to = Some(to);
        self
    }

    pub fn split_dt(mut self, split_dt: bool) -> Self {
        self.split_dt = split_dt;
        self
    }
}

impl Endpoint for IntradayHistorical {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let symbol = validate_normalize_symbol(&self.symbol)?;
        let request = RequestDescriptor::new(format!("intraday/{symbol}")).param("interval", self.interval);
        let request = with_date_range(request, self.from, self.to)?;
        Ok(if self.split_dt { request.param("split-dt", 1) } else { request })
    }
}

#[derive(Debug, Clone)]
pub struct EodHistoricalApi {
    client: EodhdClient,
}

impl EodHistoricalApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_eod_data(&self, request: &EodHistorical) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for EodHistoricalApi {
    const KIND: ApiKind = ApiKind::EodHistorical;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone)]
pub struct IntradayHistoricalApi {
    client: EodhdClient,
}

impl IntradayHistoricalApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_intraday_data(&self, request: &IntradayHistorical) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for IntradayHistoricalApi {
    const KIND: ApiKind = ApiKind::IntradayHistorical;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}
