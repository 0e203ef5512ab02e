//! Byte-level progress for one stream: shared counter, per-chunk meters and
//! the sampling task that turns the counter into monotonic progress events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::descriptor::StreamKind;

/// Snapshot of download progress for one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProgress {
    pub kind: StreamKind,
    /// Distinct bytes written to part files so far.
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Elapsed time since the download started (seconds).
    pub elapsed_secs: f64,
}

impl StreamProgress {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }

    /// Whole percent in 0..=100, rounded down.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        (self.bytes_done.min(self.total_bytes) * 100 / self.total_bytes) as u8
    }

    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }
}

/// Counts a chunk's bytes into the stream counter.
///
/// Only bytes beyond the chunk's previous high-water mark are added, so a
/// retried attempt that rewrites the same span does not count it twice and
/// the stream counter never exceeds the total size.
#[derive(Debug, Clone)]
pub(crate) struct ChunkMeter {
    counter: Arc<AtomicU64>,
    high_water: Arc<AtomicU64>,
}

impl ChunkMeter {
    pub(crate) fn new(counter: Arc<AtomicU64>) -> Self {
        Self {
            counter,
            high_water: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record that the current attempt has now written `written` bytes in total.
    /// Only one attempt of a chunk runs at a time.
    pub(crate) fn record(&self, written: u64) {
        let hw = self.high_water.load(Ordering::Relaxed);
        if written > hw {
            self.high_water.store(written, Ordering::Relaxed);
            self.counter.fetch_add(written - hw, Ordering::Relaxed);
        }
    }
}

/// Periodically samples `counter` and sends a `StreamProgress` whenever the
/// whole percentage rises. Runs until aborted by the downloader.
pub(crate) async fn report_loop(
    kind: StreamKind,
    counter: Arc<AtomicU64>,
    total_bytes: u64,
    started: Instant,
    interval: Duration,
    tx: mpsc::Sender<StreamProgress>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_percent: Option<u8> = None;
    loop {
        ticker.tick().await;
        let stats = StreamProgress {
            kind,
            bytes_done: counter.load(Ordering::Relaxed),
            total_bytes,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        let pct = stats.percent();
        if last_percent.map_or(true, |last| pct > last) {
            last_percent = Some(pct);
            // Dropped samples are fine: a later one carries a higher count.
            let _ = tx.try_send(stats);
        }
    }
}
