//! Single-chunk ranged GET into a part file, and the async task that runs it
//! under the stream's admission limit with retries.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::abort::AbortSignal;
use super::progress::ChunkMeter;
use crate::descriptor::StreamDescriptor;
use crate::http::{self, HttpOptions};
use crate::planner::Chunk;
use crate::retry::{run_with_retry, ChunkState, FetchError, RetryError, RetryPolicy};
use crate::storage::PartWriter;

const PARTIAL_CONTENT: u32 = 206;

/// One attempt: GET `chunk` with a Range header and stream the body into `part`.
///
/// The status line is checked before the first body byte is written, so a
/// server that ignores the range never leaves a full-body part file behind.
/// Returns the number of bytes written. Blocking; run on the blocking pool.
pub(crate) fn fetch_chunk(
    descriptor: &StreamDescriptor,
    chunk: &Chunk,
    part: &Path,
    timeout: Duration,
    http_opts: &HttpOptions,
    meter: &ChunkMeter,
    abort: &AbortSignal,
) -> Result<u64, FetchError> {
    if abort.is_raised() {
        return Err(FetchError::Cancelled);
    }

    let mut writer = PartWriter::create(part).map_err(FetchError::Storage)?;

    let mut easy = http::easy_for_stream(descriptor, http_opts)?;
    easy.timeout(timeout)?;
    easy.range(&chunk.curl_range())?;

    let status = Cell::new(0u32);
    let failure: RefCell<Option<FetchError>> = RefCell::new(None);

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            if let Some(code) = http::parse_status_line(line) {
                status.set(code);
            }
            true
        })?;
        transfer.write_function(|data| {
            if abort.is_raised() {
                failure.replace(Some(FetchError::Cancelled));
                return Ok(0);
            }
            if status.get() != PARTIAL_CONTENT {
                failure.replace(Some(non_partial(status.get())));
                return Ok(0);
            }
            if let Err(e) = writer.append(data) {
                failure.replace(Some(FetchError::Storage(e)));
                return Ok(0);
            }
            meter.record(writer.written());
            Ok(data.len())
        })?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if let Some(f) = failure.into_inner() {
            return Err(f);
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if code != PARTIAL_CONTENT {
        return Err(non_partial(code));
    }

    let received = writer.finish().map_err(FetchError::Storage)?;
    let expected = chunk.len();
    if received != expected {
        return Err(FetchError::PartialTransfer { expected, received });
    }
    Ok(received)
}

/// Error statuses stay HTTP errors; any other non-206 answer ignored the range.
fn non_partial(code: u32) -> FetchError {
    if code >= 400 {
        FetchError::Http(code)
    } else {
        FetchError::UnsupportedRange(code)
    }
}

/// Everything a chunk task needs; cloned per attempt into the blocking closure.
#[derive(Clone)]
pub(crate) struct ChunkJob {
    pub(crate) descriptor: Arc<StreamDescriptor>,
    pub(crate) chunk: Chunk,
    pub(crate) part: PathBuf,
    pub(crate) http: HttpOptions,
    pub(crate) meter: ChunkMeter,
    pub(crate) abort: Arc<AbortSignal>,
}

impl ChunkJob {
    /// Waits for an admission permit, then fetches with retries. The permit is
    /// held across retries. A failed attempt's part file is removed before the
    /// backoff, and the backoff ends early once the stream is aborted.
    pub(crate) async fn run(
        self,
        policy: RetryPolicy,
        semaphore: Arc<Semaphore>,
    ) -> Result<u64, (u32, RetryError)> {
        let _permit = match semaphore.acquire_owned().await {
            Ok(p) => p,
            Err(_) => return Err((0, RetryError::Fatal(FetchError::Cancelled))),
        };
        if self.abort.is_raised() {
            return Err((0, RetryError::Fatal(FetchError::Cancelled)));
        }

        let mut state = ChunkState::new(self.chunk.index);
        let abort = Arc::clone(&self.abort);
        let sleep = move |delay: Duration| {
            let abort = Arc::clone(&abort);
            async move { abort.sleep(delay).await }
        };
        let res = run_with_retry(&policy, &mut state, sleep, |attempt| {
            let job = self.clone();
            let timeout = policy.timeout_for(attempt);
            async move {
                let part = job.part.clone();
                let res = tokio::task::spawn_blocking(move || {
                    fetch_chunk(
                        &job.descriptor,
                        &job.chunk,
                        &job.part,
                        timeout,
                        &job.http,
                        &job.meter,
                        &job.abort,
                    )
                })
                .await
                .unwrap_or_else(|e| Err(FetchError::Task(e.to_string())));
                if res.is_err() {
                    remove_part(&part);
                }
                res
            }
        })
        .await;

        match res {
            Ok(bytes) => {
                tracing::trace!(chunk = self.chunk.index, bytes, attempts = state.attempts, "chunk done");
                Ok(bytes)
            }
            Err(e) => Err((state.attempts, e)),
        }
    }
}

fn remove_part(part: &Path) {
    if let Err(e) = std::fs::remove_file(part) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %part.display(), error = %e, "failed to remove part file");
        }
    }
}
