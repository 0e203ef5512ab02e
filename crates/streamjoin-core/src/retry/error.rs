//! Errors of a single fetch attempt and of a whole retry sequence.

/// Error returned by one fetch attempt (curl failure, bad status, storage failure).
/// Kept separate from `anyhow` so the retry policy can classify it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Non-2xx answer to a probe or metadata request.
    #[error("HTTP {0}")]
    Http(u32),
    /// A ranged GET was answered with something other than 206 Partial Content.
    #[error("server answered HTTP {0} to a range request (expected 206)")]
    UnsupportedRange(u32),
    /// Transfer completed but fewer bytes arrived than the chunk length
    /// (e.g. server closed early).
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Part file could not be created or written. Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    /// A sibling chunk failed terminally and the download is being torn down.
    #[error("cancelled")]
    Cancelled,
    /// The blocking task running the transfer panicked or was dropped.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Status code carried by this error, if any.
    pub fn status(&self) -> Option<u32> {
        match self {
            FetchError::Http(code) | FetchError::UnsupportedRange(code) => Some(*code),
            _ => None,
        }
    }
}

/// Terminal outcome of a retry sequence.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: FetchError,
    },
    /// The error is not worth retrying (storage, cancellation, malformed request).
    #[error(transparent)]
    Fatal(FetchError),
}

impl RetryError {
    /// The last attempt's error.
    pub fn last(&self) -> &FetchError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(e) => e,
        }
    }

    pub fn into_last(self) -> FetchError {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal(e) => e,
        }
    }
}
