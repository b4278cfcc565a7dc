pub mod costs;
pub mod error;
pub mod limiter;
pub mod presets;
pub mod quota;
pub mod token_bucket;
mod time;

pub use costs::get_endpoint_cost;
pub use error::RateLimitError;
pub use error::Result;
pub use limiter::RateLimiter;
pub use quota::DrawSource;
pub use quota::QuotaCoordinator;
pub use quota::QuotaCoordinatorBuilder;
pub use quota::QuotaSnapshot;
pub use token_bucket::TokenBucket;
pub use token_bucket::TokenBucketBuilder;
