//! Dual-stream coordinator: runs the audio and video downloads of one media
//! item, blends their progress into a single percentage and removes the
//! surviving half of a pair when the other half fails.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::descriptor::{StreamDescriptor, StreamKind};
use crate::downloader::{DownloadError, DownloadedStream, StreamDownloader, StreamProgress};

/// Share of the composite bar given to audio when it runs first.
const AUDIO_BAND: u8 = 20;

/// How the two streams of a pair are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamOrder {
    /// Audio is fetched first into `[0, 20)`, video then fills `[20, 100]`.
    #[default]
    AudioFirst,
    /// Both run at once; the bar tracks combined bytes.
    Concurrent,
}

/// Caller-visible progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub status: String,
}

impl Progress {
    pub fn new(percent: u8, status: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            status: status.into(),
        }
    }
}

/// Both elementary files of a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedPair {
    pub video: DownloadedStream,
    pub audio: DownloadedStream,
}

/// Folds per-stream samples into one non-decreasing percentage.
#[derive(Debug)]
struct CompositeProgress {
    order: StreamOrder,
    video: Option<(u64, u64)>,
    audio: Option<(u64, u64)>,
    last: Option<u8>,
}

impl CompositeProgress {
    fn new(order: StreamOrder) -> Self {
        Self {
            order,
            video: None,
            audio: None,
            last: None,
        }
    }

    /// Returns an event only when the composite percentage rises.
    fn update(&mut self, sample: &StreamProgress) -> Option<Progress> {
        let slot = (sample.bytes_done.min(sample.total_bytes), sample.total_bytes);
        match sample.kind {
            StreamKind::Video => self.video = Some(slot),
            StreamKind::Audio => self.audio = Some(slot),
        }

        let raw = match self.order {
            StreamOrder::AudioFirst => match sample.kind {
                StreamKind::Audio => scale(sample.fraction(), 0, AUDIO_BAND),
                StreamKind::Video => scale(sample.fraction(), AUDIO_BAND, 100),
            },
            StreamOrder::Concurrent => {
                // Nothing is blended until both totals are known.
                let (Some((vd, vt)), Some((ad, at))) = (self.video, self.audio) else {
                    return None;
                };
                let total = vt + at;
                if total == 0 {
                    0
                } else {
                    ((vd + ad) * 100 / total) as u8
                }
            }
        };

        if self.last.map_or(false, |last| raw <= last) {
            return None;
        }
        self.last = Some(raw);
        Some(Progress::new(raw, status_for(self.order, sample.kind)))
    }
}

fn status_for(order: StreamOrder, kind: StreamKind) -> String {
    match order {
        StreamOrder::AudioFirst => format!("downloading {}", kind.label()),
        StreamOrder::Concurrent => "downloading".to_string(),
    }
}

/// Maps `fraction` in [0, 1] into `[lo, hi]`, rounding down.
pub(crate) fn scale(fraction: f64, lo: u8, hi: u8) -> u8 {
    let f = fraction.clamp(0.0, 1.0);
    let span = f64::from(hi.saturating_sub(lo));
    lo + (f * span).floor() as u8
}

pub struct DualStreamCoordinator {
    downloader: StreamDownloader,
    order: StreamOrder,
}

impl DualStreamCoordinator {
    pub fn new(downloader: StreamDownloader, order: StreamOrder) -> Self {
        Self { downloader, order }
    }

    pub fn order(&self) -> StreamOrder {
        self.order
    }

    /// Downloads both streams to `<base>.mp4` and `<base>.mp3`.
    ///
    /// Fails if either stream fails; in that case the other stream's file is
    /// removed before returning. All progress events are delivered before
    /// this returns.
    pub async fn download_both(
        &self,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        base: &Path,
        progress: Option<mpsc::Sender<Progress>>,
    ) -> Result<DownloadedPair, DownloadError> {
        let (sample_tx, forwarder) = match progress {
            Some(out) => {
                let (tx, rx) = mpsc::channel::<StreamProgress>(64);
                let fwd = tokio::spawn(forward(rx, out, CompositeProgress::new(self.order)));
                (Some(tx), Some(fwd))
            }
            None => (None, None),
        };

        let result = match self.order {
            StreamOrder::AudioFirst => self.sequential(video, audio, base, sample_tx).await,
            StreamOrder::Concurrent => self.concurrent(video, audio, base, sample_tx).await,
        };

        if let Some(fwd) = forwarder {
            if let Err(e) = fwd.await {
                tracing::warn!(error = %e, "progress forwarder ended abnormally");
            }
        }
        result
    }

    async fn sequential(
        &self,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        base: &Path,
        tx: Option<mpsc::Sender<StreamProgress>>,
    ) -> Result<DownloadedPair, DownloadError> {
        let audio_done = self.downloader.download(audio, base, tx.clone()).await?;
        match self.downloader.download(video, base, tx).await {
            Ok(video_done) => Ok(DownloadedPair {
                video: video_done,
                audio: audio_done,
            }),
            Err(e) => {
                discard(&audio_done);
                Err(e)
            }
        }
    }

    async fn concurrent(
        &self,
        video: &StreamDescriptor,
        audio: &StreamDescriptor,
        base: &Path,
        tx: Option<mpsc::Sender<StreamProgress>>,
    ) -> Result<DownloadedPair, DownloadError> {
        let (v, a) = tokio::join!(
            self.downloader.download(video, base, tx.clone()),
            self.downloader.download(audio, base, tx),
        );
        match (v, a) {
            (Ok(video), Ok(audio)) => Ok(DownloadedPair { video, audio }),
            (Ok(video), Err(e)) => {
                discard(&video);
                Err(e)
            }
            (Err(e), Ok(audio)) => {
                discard(&audio);
                Err(e)
            }
            (Err(e), Err(other)) => {
                tracing::warn!(error = %other, "audio stream also failed");
                Err(e)
            }
        }
    }
}

/// Removes a completed elementary file whose partner failed.
fn discard(stream: &DownloadedStream) {
    match std::fs::remove_file(&stream.path) {
        Ok(()) => tracing::info!(path = %stream.path.display(), "removed orphaned {} file", stream.kind),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %stream.path.display(), error = %e, "failed to remove orphaned file"),
    }
}

async fn forward(
    mut rx: mpsc::Receiver<StreamProgress>,
    out: mpsc::Sender<Progress>,
    mut composite: CompositeProgress,
) {
    while let Some(sample) = rx.recv().await {
        if let Some(p) = composite.update(&sample) {
            // Receiver gone: keep draining so the downloads never block.
            let _ = out.send(p).await;
        }
    }
}
