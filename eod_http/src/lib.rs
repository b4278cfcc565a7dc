pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod discovery;
pub mod dispatcher;
pub mod errors;
pub mod session;
pub mod transport;
pub mod validation;

pub use api::ApiKind;
pub use api::EodhdApi;
pub use api::EodhdClient;
pub use api::Endpoint;
pub use api::SubApi;
pub use client::HttpClient;
pub use client::HttpClientConfig;
pub use config::EodhdConfig;
pub use context::ApiContext;
pub use context::ApiContextBuilder;
pub use discovery::AccountLimits;
pub use discovery::ArmedQuota;
pub use discovery::LimitDiscovery;
pub use dispatcher::Backoff;
pub use dispatcher::RequestDescriptor;
pub use dispatcher::Sleeper;
pub use dispatcher::TokioSleeper;
pub use errors::ApiError;
pub use errors::Result;
pub use session::SessionGuard;
pub use session::SessionManager;
pub use transport::RawResponse;
pub use transport::Transport;
