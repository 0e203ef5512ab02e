//! End-to-end job: both streams into a hidden temp dir, then one merged
//! `<destination>/<title>.mp4`, reported as a single `(percent, status)` stream.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::config::StreamjoinConfig;
use crate::coordinator::{scale, DualStreamCoordinator, Progress};
use crate::descriptor::{StreamDescriptor, StreamKind};
use crate::downloader::{DownloadOptions, StreamDownloader};
use crate::merger::{FfmpegMuxer, Merger, Muxer};

/// Hidden scratch directory under the destination.
pub const TEMP_DIR_NAME: &str = ".temp";

/// Download progress occupies `[0, DOWNLOAD_BAND)`; merging starts here.
const DOWNLOAD_BAND: u8 = 90;

/// One media item to fetch and merge.
#[derive(Debug, Clone)]
pub struct MediaJob {
    /// File name stem of the merged output (already sanitized).
    pub title: String,
    pub video: StreamDescriptor,
    pub audio: StreamDescriptor,
    /// Directory receiving `<title>.mp4`.
    pub destination: PathBuf,
}

/// A finished job: the merged file and the sizes of the streams behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedMedia {
    pub path: PathBuf,
    pub video_bytes: u64,
    pub audio_bytes: u64,
}

impl MergedMedia {
    /// Combined size of both downloaded streams.
    pub fn stream_bytes(&self) -> u64 {
        self.video_bytes + self.audio_bytes
    }
}

pub struct Pipeline<M> {
    coordinator: DualStreamCoordinator,
    merger: Arc<Merger<M>>,
}

impl Pipeline<FfmpegMuxer> {
    pub fn from_config(cfg: &StreamjoinConfig) -> Self {
        let downloader = StreamDownloader::new(DownloadOptions::from_config(cfg));
        Self::new(
            DualStreamCoordinator::new(downloader, cfg.order),
            Merger::new(FfmpegMuxer::new(&cfg.merge.ffmpeg), cfg.merge.temp_policy()),
        )
    }
}

impl<M: Muxer + 'static> Pipeline<M> {
    pub fn new(coordinator: DualStreamCoordinator, merger: Merger<M>) -> Self {
        Self {
            coordinator,
            merger: Arc::new(merger),
        }
    }

    /// Runs `job` and returns the merged file.
    ///
    /// Nothing is merged unless both streams downloaded; temp files are
    /// removed on every failure path (subject to the merger's temp policy).
    pub async fn run(&self, job: &MediaJob, progress: Option<mpsc::Sender<Progress>>) -> Result<MergedMedia> {
        let temp_dir = job.destination.join(TEMP_DIR_NAME);
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("create temp dir {}", temp_dir.display()))?;
        let base = unique_base(&temp_dir);
        tracing::info!(title = %job.title, base = %base.display(), "starting media job");

        let result = self.run_in(job, &base, progress).await;
        remove_dir_if_empty(&temp_dir);
        result
    }

    async fn run_in(
        &self,
        job: &MediaJob,
        base: &Path,
        progress: Option<mpsc::Sender<Progress>>,
    ) -> Result<MergedMedia> {
        let (download_tx, forwarder) = match progress.clone() {
            Some(out) => {
                let (tx, rx) = mpsc::channel::<Progress>(32);
                (Some(tx), Some(tokio::spawn(forward_scaled(rx, out))))
            }
            None => (None, None),
        };

        let downloaded = self
            .coordinator
            .download_both(&job.video, &job.audio, base, download_tx)
            .await;
        if let Some(fwd) = forwarder {
            let _ = fwd.await;
        }
        let pair = downloaded.context("downloading streams")?;

        emit(progress.as_ref(), DOWNLOAD_BAND, "merging").await;

        let merger = Arc::clone(&self.merger);
        let video = pair.video.path.clone();
        let audio = pair.audio.path.clone();
        let output_base = job.destination.join(&job.title);
        let output = tokio::task::spawn_blocking(move || merger.merge(&video, &audio, &output_base))
            .await
            .context("merge task failed")?
            .context("merging streams")?;

        emit(progress.as_ref(), 100, "done").await;
        tracing::info!(output = %output.display(), "media job complete");
        Ok(MergedMedia {
            path: output,
            video_bytes: pair.video.total_bytes,
            audio_bytes: pair.audio.total_bytes,
        })
    }
}

async fn emit(progress: Option<&mpsc::Sender<Progress>>, percent: u8, status: &str) {
    if let Some(tx) = progress {
        let _ = tx.send(Progress::new(percent, status)).await;
    }
}

/// Maps coordinator percentages into the download band.
async fn forward_scaled(mut rx: mpsc::Receiver<Progress>, out: mpsc::Sender<Progress>) {
    let mut last: Option<u8> = None;
    while let Some(p) = rx.recv().await {
        let scaled = download_percent(p.percent);
        if last.map_or(true, |l| scaled > l) {
            last = Some(scaled);
            let _ = out.send(Progress::new(scaled, p.status)).await;
        }
    }
}

fn download_percent(percent: u8) -> u8 {
    scale(f64::from(percent) / 100.0, 0, DOWNLOAD_BAND).min(DOWNLOAD_BAND - 1)
}

/// `<temp_dir>/<unix seconds>`, bumped until neither elementary file exists.
fn unique_base(temp_dir: &Path) -> PathBuf {
    let mut stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    loop {
        let base = temp_dir.join(stamp.to_string());
        let taken = [StreamKind::Video, StreamKind::Audio]
            .iter()
            .any(|k| k.elementary_path(&base).exists());
        if !taken {
            return base;
        }
        stamp += 1;
    }
}

fn remove_dir_if_empty(dir: &Path) {
    let empty = fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        if let Err(e) = fs::remove_dir(dir) {
            tracing::debug!(dir = %dir.display(), error = %e, "temp dir not removed");
        }
    }
}
