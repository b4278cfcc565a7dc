use serde_json::Value;

use super::ApiKind;
use super::EodhdClient;
use super::Endpoint;
use super::SubApi;
use crate::dispatcher::RequestDescriptor;
use crate::errors::Result;

/// Account details: subscription, daily limit and calls used today
///
/// Costs nothing against the daily quota.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserInfo;

impl Endpoint for UserInfo {
    fn build_request(&self) -> Result<RequestDescriptor> {
        Ok(RequestDescriptor::new("user"))
    }
}

#[derive(Debug, Clone)]
pub struct UserApi {
    client: EodhdClient,
}

impl UserApi {
    pub fn client(&self) -> &EodhdClient {
        &self.client
    }

    pub async fn get_user_info(&self) -> Result<Value> {
        self.client.execute(&UserInfo).await
    }
}

impl SubApi for UserApi {
    const KIND: ApiKind = ApiKind::User;

    fn new(client: EodhdClient) -> Self {
        Self { client }
    }
}
