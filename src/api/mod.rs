pub mod retry;
pub mod stats_api;

pub use retry::{retry_with_backoff, RetryPolicy};
pub use stats_api::{SeasonType, StatsApiClient};
