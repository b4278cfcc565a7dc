use serde_json::Value;
use time::Date;

use super::unwrap_list;
use super::with_date_range;
use super::ApiKind;
use super::EodhdClient;
use super::Endpoint;
use super::SubApi;
use crate::dispatcher::RequestDescriptor;
use crate::errors::Result;
use crate::validation::validate_normalize_symbol;

/// Historical and upcoming earnings
///
/// Without a date range the service returns today plus seven days. The
/// response wrapper is stripped down to the `earnings` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Earnings {
    pub symbols: Vec<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Earnings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
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

impl Endpoint for Earnings {
    fn build_request(&self) -> Result<RequestDescriptor> {
        let mut request = RequestDescriptor::new("calendar/earnings");
        if !self.symbols.is_empty() {
            let symbols = self.symbols.iter().map(|s| validate_normalize_symbol(s)).collect::<Result<Vec<_>>>()?;
            request = request.param("symbols", symbols.join(","));
        }
        with_date_range(request, self.from, self.to)
    }

    fn reshape(&self, payload: Value) -> Value {
        unwrap_list(payload, "earnings")
    }
}

/// Historical and upcoming IPOs, filtered by filing date
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipos {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl Ipos {
    pub fn new() -> Self {
        Self::default()
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

impl Endpoint for Ipos {
    fn build_request(&self) -> Result<RequestDescriptor> {
        with_date_range(RequestDescriptor::new("calendar/ipos"), self.from, self.to)
    }

    fn reshape(&self, payload: Value) -> Value {
        unwrap_list(payload, "ipos")
    }
}

#[derive(Debug, Clone)]
pub struct EarningsApi {
    client: EodhdClient,
}

impl EarningsApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_earnings(&self, request: &Earnings) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for EarningsApi {
    const KIND: ApiKind = ApiKind::Earnings;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone)]
pub struct IposApi {
    client: EodhdClient,
}

impl IposApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_ipos(&self, request: &Ipos) -> Result<Value> {
        self.client.execute(request).await
    }
}

impl SubApi for IposApi {
    const KIND: ApiKind = ApiKind::Ipos;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;

    #[test]
    fn test_earnings_symbols_joined() {
        let request = Earnings::new().symbols(["AAPL.US", "BRK.B.US"]).from_date(date!(2024 - 01 - 01)).build_request().unwrap();

        assert_eq!(request.endpoint, "calendar/earnings");
        assert_eq!(request.get_param("symbols"), Some("AAPL.US,BRK-B.US"));
        assert_eq!(request.get_param("from"), Some("2024-01-01"));
        assert_eq!(request.get_param("to"), None);
    }

    #[test]
    fn test_earnings_rejects_any_bad_symbol() {
        assert!(Earnings::new().symbols(["AAPL.US", "bad symbol"]).build_request().is_err());
    }

    #[test]
    fn test_earnings_reshape() {
        let earnings = Earnings::new();

        assert_eq!(earnings.reshape(json!({"type": "Earnings", "earnings": [{"code": "AAPL.US"}]})), json!([{"code": "AAPL.US"}]));
        assert_eq!(earnings.reshape(json!({"type": "Earnings"})), json!([]));
    }

    #[test]
    fn test_ipos() {
        let ipos = Ipos::new().to_date(date!(2024 - 02 - 01));
        let request = ipos.build_request().unwrap();

        assert_eq!(request.endpoint, "calendar/ipos");
        assert_eq!(request.params, vec![("to".to_string(), "2024-02-01".to_string())]);
        assert_eq!(ipos.reshape(json!({"ipos": [{"code": "NEW.US"}]})), json!([{"code": "NEW.US"}]));
        assert_eq!(ipos.reshape(json!({})), json!([]));
    }
}
