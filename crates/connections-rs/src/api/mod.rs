//! HTTP plumbing between the solver and the OpenRouter API.
//!
//! - [`retry`]: transient error detection (429, 5xx, network timeouts) and
//!   exponential backoff. Permanent errors (400/401/...) fail immediately.

pub mod retry;

pub use retry::{RetryConfig, retry_api_call};
