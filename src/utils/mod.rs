//! Utility modules supporting the search pipeline.
//!
//! - [`HttpClient`] / [`RateLimitedRequestBuilder`]: shared HTTP client with
//!   optional per-client request pacing
//! - [`RateGate`]: shared minimum-interval gate for strict external quotas
//! - [`with_paced_retry`]: bounded retries with a doubling penalty wait
//! - [`merge_duplicates`]: cross-database duplicate merging

mod dedup;
mod http;
mod retry;

pub use dedup::merge_duplicates;
pub use http::{HttpClient, RateLimitedRequestBuilder};
pub use retry::{with_paced_retry, RateGate, RetryConfig};
