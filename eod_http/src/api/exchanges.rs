use std::fmt;

use serde_json::Value;

use super::ApiKind;
use super::EodhdClient;
use super::Endpoint;
use super::SubApi;
use crate::dispatcher::RequestDescriptor;
use crate::errors::ApiError;
use crate::errors::Result;

/// Supported exchanges, including virtual ones (crypto, forex, bonds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exchanges;

impl Endpoint for Exchanges {
    fn build_request(&self) -> Result<RequestDescriptor> {
        Ok(RequestDescriptor::new("exchanges-list"))
    }
}

/// Ticker type filter for [`ExchangeSymbolList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    CommonStock,
    PreferredStock,
    Stock,
    Etf,
    Fund,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::CommonStock => "common_stock",
            SymbolType::PreferredStock => "preferred_stock",
            SymbolType::Stock => "stock",
            SymbolType::Etf => "etf",
            SymbolType::Fund => "fund",
        }
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tickers listed on one exchange (`US` covers NYSE, NASDAQ and OTC)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSymbolList {
    pub exchange_code: String,
    /// Only delisted tickers
    pub delisted: bool,
    pub symbol_type: Option<SymbolType>,
}

impl ExchangeSymbolList {
    pub fn new(exchange_code: impl Into<String>) -> Self {
        Self { exchange_code: exchange_code.into(), delisted: false, symbol_type: None }
    }

    pub fn delisted(mut self, delisted: bool) -> Self {
        self.delisted = delisted;
        self
    }

    pub fn symbol_type(mut self, symbol_type: SymbolType) -> Self {
        self.symbol_type = Some(symbol_type);
        self
    }
}

impl Endpoint for ExchangeSymbolList {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let code = self.exchange_code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ApiError::InvalidParameter(format!("Exchange code is invalid: {}", self.exchange_code)));
        }

        let request = RequestDescriptor::new(format!("exchange-symbol-list/{code}"));
        let request = if self.delisted { request.param("delisted", 1) } else { request };
        Ok(request.param_opt("type", self.symbol_type))
    }
}

#[derive(Debug, Clone)]
pub struct ExchangesApi {
    client: EodhdClient,
}

impl ExchangesApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_exchanges(&self) -> Result<Value> {
        self.client.execute(&Exchanges).await
    }
}

impl SubApi for ExchangesApi {
    const KIND: ApiKind = ApiKind::Exchanges;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeSymbolListApi {
    client: EodhdClient,
}

impl ExchangeSymbolListApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_exchange_symbols(&self, request: &ExchangeSymbolList) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for ExchangeSymbolListApi {
    const KIND: ApiKind = ApiKind::ExchangeSymbolList;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchanges_request() {
        let request = Exchanges.build_request().unwrap();
        assert_eq!(request.endpoint, "exchanges-list");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_symbol_list_defaults() {
        let request = ExchangeSymbolList::new("US").build_request().unwrap();

        assert_eq!(request.endpoint, "exchange-symbol-list/US");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_symbol_list_filters() {
        let request = ExchangeSymbolList::new("LSE").delisted(true).symbol_type(SymbolType::Etf).build_request().unwrap();

        assert_eq!(request.get_param("delisted"), Some("1"));
        assert_eq!(request.get_param("type"), Some("etf"));
    }

    #[test]
    fn test_symbol_list_rejects_bad_code() {
        assert!(ExchangeSymbolList::new("").build_request().is_err());
        assert!(ExchangeSymbolList::new("US/../user").build_request().is_err());
    }
}
