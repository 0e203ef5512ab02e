//! Chunked stream downloader.
//!
//! Consumes one stream descriptor, probes the resource length, plans chunks,
//! runs one ranged GET per chunk (at most `max_concurrent` in flight), then
//! folds the part files into `<base>.<ext>` in chunk order. Part files are
//! removed whether the download succeeds or fails.

mod abort;
mod chunk;
mod progress;

pub use progress::StreamProgress;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::config::StreamjoinConfig;
use crate::descriptor::{StreamDescriptor, StreamKind};
use crate::fetch_head::{self, HeadResult};
use crate::http::HttpOptions;
use crate::planner::{ChunkPlan, ChunkPlanner, PlanError};
use crate::retry::{FetchError, RetryError, RetryPolicy};
use crate::storage;
use abort::AbortSignal;
use chunk::ChunkJob;
use progress::ChunkMeter;

/// Default admission limit: ranged GETs in flight per resource.
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Typed failure of a stream download (or of the dual-stream pair).
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HEAD probe failed outright.
    #[error("{kind} size probe failed: {source}")]
    Probe {
        kind: StreamKind,
        #[source]
        source: FetchError,
    },
    /// Probe answered without a usable Content-Length.
    #[error("{0} size unknown: server sent no or zero Content-Length")]
    SizeUnknown(StreamKind),
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// A chunk failed every allowed attempt.
    #[error("{kind} chunk {index} failed after {attempts} attempts: {last}")]
    ChunkExhausted {
        kind: StreamKind,
        index: usize,
        attempts: u32,
        #[source]
        last: FetchError,
    },
    /// A chunk failed with an error that is not retried (e.g. disk full).
    #[error("{kind} chunk {index} failed: {source}")]
    ChunkFailed {
        kind: StreamKind,
        index: usize,
        #[source]
        source: FetchError,
    },
    /// Part files could not be folded into the destination file.
    #[error("{kind} assembly failed: {message}")]
    Assembly { kind: StreamKind, message: String },
    /// A spawned task panicked or was cancelled by the runtime.
    #[error("{kind} download task failed: {message}")]
    Task { kind: StreamKind, message: String },
}

impl DownloadError {
    /// Last HTTP status seen, for diagnosis.
    pub fn last_status(&self) -> Option<u32> {
        match self {
            DownloadError::Probe { source, .. } => source.status(),
            DownloadError::ChunkExhausted { last, .. } => last.status(),
            DownloadError::ChunkFailed { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True when the server refused to honour byte ranges.
    pub fn is_unsupported_range(&self) -> bool {
        matches!(
            self,
            DownloadError::ChunkExhausted {
                last: FetchError::UnsupportedRange(_),
                ..
            } | DownloadError::ChunkFailed {
                source: FetchError::UnsupportedRange(_),
                ..
            }
        )
    }

    fn from_chunk(kind: StreamKind, index: usize, attempts: u32, err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => DownloadError::ChunkExhausted {
                kind,
                index,
                attempts,
                last,
            },
            RetryError::Fatal(source) => {
                tracing::debug!(%kind, index, attempts, "chunk failed without retry");
                DownloadError::ChunkFailed {
                    kind,
                    index,
                    source,
                }
            }
        }
    }

    fn is_cancellation(&self) -> bool {
        matches!(
            self,
            DownloadError::ChunkFailed {
                source: FetchError::Cancelled,
                ..
            }
        )
    }
}

/// A completed elementary stream on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedStream {
    pub kind: StreamKind,
    /// `<base>.<ext>`.
    pub path: PathBuf,
    pub total_bytes: u64,
    pub chunk_count: usize,
}

/// Tunables for a stream download.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub planner: ChunkPlanner,
    pub retry: RetryPolicy,
    /// Maximum concurrent ranged GETs for one resource.
    pub max_concurrent: usize,
    pub http: HttpOptions,
    /// How often the progress sampler reads the byte counter.
    pub progress_interval: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            planner: ChunkPlanner::default(),
            retry: RetryPolicy::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            http: HttpOptions::default(),
            progress_interval: Duration::from_millis(200),
        }
    }
}

impl DownloadOptions {
    pub fn from_config(cfg: &StreamjoinConfig) -> Self {
        Self {
            planner: cfg.chunking.planner(),
            retry: cfg.retry_policy(),
            max_concurrent: cfg.max_concurrent_fetches.max(1),
            http: cfg.http.options(),
            progress_interval: Duration::from_millis(200),
        }
    }
}

/// Downloads one elementary stream by concurrent ranged GETs.
#[derive(Debug, Clone, Default)]
pub struct StreamDownloader {
    options: DownloadOptions,
}

impl StreamDownloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Downloads `descriptor` into `<base>.<ext>`.
    ///
    /// Progress samples are sent on `progress` (percent never decreases; a
    /// final 100% sample is sent on success). On any failure no destination
    /// file is left behind and every part file is removed.
    pub async fn download(
        &self,
        descriptor: &StreamDescriptor,
        base: &Path,
        progress: Option<mpsc::Sender<StreamProgress>>,
    ) -> Result<DownloadedStream, DownloadError> {
        let kind = descriptor.kind;
        let dest = kind.elementary_path(base);
        let started = Instant::now();

        match storage::remove_stray_parts(&dest) {
            Ok(0) => {}
            Ok(n) => tracing::info!(%kind, removed = n, "removed leftover part files"),
            Err(e) => tracing::warn!(%kind, error = %e, "could not scan for leftover part files"),
        }

        let head = self.probe(descriptor).await?;
        let total = head.usable_length().ok_or(DownloadError::SizeUnknown(kind))?;
        let plan = self.options.planner.plan(total)?;
        tracing::info!(
            %kind,
            total_bytes = total,
            chunks = plan.len(),
            chunk_size = plan.chunk_size(),
            accept_ranges = head.accept_ranges,
            "starting chunked download"
        );

        let fetched = self.fetch_all(descriptor, &dest, &plan, started, progress.as_ref()).await;
        let result = match fetched {
            Ok(()) => self.assemble(kind, &dest, &plan).await,
            Err(e) => Err(e),
        };

        storage::remove_parts(&dest, plan.len());

        match result {
            Ok(()) => {
                if let Some(tx) = progress {
                    let _ = tx
                        .send(StreamProgress {
                            kind,
                            bytes_done: total,
                            total_bytes: total,
                            elapsed_secs: started.elapsed().as_secs_f64(),
                        })
                        .await;
                }
                tracing::info!(%kind, path = %dest.display(), "stream download complete");
                Ok(DownloadedStream {
                    kind,
                    path: dest,
                    total_bytes: total,
                    chunk_count: plan.len(),
                })
            }
            Err(e) => {
                if let Err(rm) = std::fs::remove_file(&dest) {
                    if rm.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %dest.display(), error = %rm, "failed to remove incomplete file");
                    }
                }
                tracing::warn!(%kind, error = %e, "stream download failed");
                Err(e)
            }
        }
    }

    async fn probe(&self, descriptor: &StreamDescriptor) -> Result<HeadResult, DownloadError> {
        let kind = descriptor.kind;
        let d = descriptor.clone();
        let http = self.options.http.clone();
        tokio::task::spawn_blocking(move || fetch_head::probe(&d, &http))
            .await
            .map_err(|e| DownloadError::Task {
                kind,
                message: e.to_string(),
            })?
            .map_err(|source| DownloadError::Probe { kind, source })
    }

    /// Runs every chunk task to completion. The first terminal failure raises
    /// the abort flag so queued chunks stop without fetching and in-flight
    /// transfers stop at their next write; all tasks are still awaited.
    async fn fetch_all(
        &self,
        descriptor: &StreamDescriptor,
        dest: &Path,
        plan: &ChunkPlan,
        started: Instant,
        progress: Option<&mpsc::Sender<StreamProgress>>,
    ) -> Result<(), DownloadError> {
        let kind = descriptor.kind;
        let counter = Arc::new(AtomicU64::new(0));
        let abort = Arc::new(AbortSignal::new());
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent.max(1)));
        let descriptor = Arc::new(descriptor.clone());

        let reporter = progress.map(|tx| {
            tokio::spawn(progress::report_loop(
                kind,
                Arc::clone(&counter),
                plan.total_size(),
                started,
                self.options.progress_interval,
                tx.clone(),
            ))
        });

        let mut tasks = JoinSet::new();
        for c in plan.chunks() {
            let job = ChunkJob {
                descriptor: Arc::clone(&descriptor),
                chunk: *c,
                part: storage::part_path(dest, c.index),
                http: self.options.http.clone(),
                meter: ChunkMeter::new(Arc::clone(&counter)),
                abort: Arc::clone(&abort),
            };
            let policy = self.options.retry;
            let sem = Arc::clone(&semaphore);
            let index = c.index;
            tasks.spawn(async move { (index, job.run(policy, sem).await) });
        }

        let mut first_error: Option<DownloadError> = None;
        while let Some(joined) = tasks.join_next().await {
            let err = match joined {
                Ok((_, Ok(_bytes))) => continue,
                Ok((index, Err((attempts, e)))) => DownloadError::from_chunk(kind, index, attempts, e),
                Err(e) => DownloadError::Task {
                    kind,
                    message: e.to_string(),
                },
            };
            abort.raise();
            let replace = match &first_error {
                None => true,
                Some(prev) => prev.is_cancellation() && !err.is_cancellation(),
            };
            if replace {
                first_error = Some(err);
            }
        }

        if let Some(r) = reporter {
            r.abort();
            let _ = r.await;
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn assemble(&self, kind: StreamKind, dest: &Path, plan: &ChunkPlan) -> Result<(), DownloadError> {
        let d = dest.to_path_buf();
        let p = plan.clone();
        tokio::task::spawn_blocking(move || storage::assemble_parts(&d, &p))
            .await
            .map_err(|e| DownloadError::Task {
                kind,
                message: e.to_string(),
            })?
            .map(|_| ())
            .map_err(|e| DownloadError::Assembly {
                kind,
                message: format!("{:#}", e),
            })
    }
}
