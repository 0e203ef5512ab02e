//! Retry and backoff policy for chunk fetches.
//!
//! Classifies attempt failures (timeouts, connection errors, rejected ranges,
//! short transfers), decides whether and when to retry, and drives the
//! per-chunk state machine. Sleeping is injected so the loop can be tested
//! without wall-clock delays.

mod classify;
mod error;
mod policy;
mod run;
mod state;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::{FetchError, RetryError};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
pub use state::{ChunkState, ChunkStatus};
