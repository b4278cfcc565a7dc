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

/// Dividend history of one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dividends {
    pub symbol: String,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Dividends {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), from: None, to: None }
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

impl Endpoint for Dividends {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let symbol = validate_normalize_symbol(&self.symbol)?;
        with_date_range(RequestDescriptor::new(format!("div/{symbol}")), self.from, self.to)
    }
}

/// Split history of one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splits {
    pub symbol: String,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Splits {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self { symbol: symbol.into(), from: None, to: None }
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

impl Endpoint for Splits {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let symbol = validate_normalize_symbol(&self.symbol)?;
        with_date_range(RequestDescriptor::new(format!("splits/{symbol}")), self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct DividendsApi {
    client: EodhdClient,
}

impl DividendsApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_dividends(&self, request: &Dividends) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for DividendsApi {
    const KIND: ApiKind = ApiKind::Dividends;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone)]
pub struct SplitsApi {
    client: EodhdClient,
}

impl SplitsApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_splits(&self, request: &Splits) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for SplitsApi {
    const KIND: ApiKind = ApiKind::Splits;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn test_dividends_request() {
        let request = Dividends::new("AAPL.US").from_date(date!(2020 - 01 - 01)).to_date(date!(2020 - 12 - 31)).build_request().unwrap();

        assert_eq!(request.endpoint, "div/AAPL.US");
        assert_eq!(request.get_param("from"), Some("2020-01-01"));
        assert_eq!(request.get_param("to"), Some("2020-12-31"));
    }

    #[test]
    fn test_splits_request_without_range() {
        let request = Splits::new("BRK.B.US").build_request().unwrap();

        assert_eq!(request.endpoint, "splits/BRK-B.US");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_invalid_symbol() {
        assert!(Dividends::new("symbol@invalid").build_request().is_err());
        assert!(Splits::new("").build_request().is_err());
    }
}
