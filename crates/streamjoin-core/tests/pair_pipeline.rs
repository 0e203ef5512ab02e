//! Integration tests: audio/video pair through the coordinator and merger.

mod common;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::range_server::{self, RangeServerOptions};
use streamjoin_core::coordinator::{DualStreamCoordinator, Progress, StreamOrder};
use streamjoin_core::descriptor::{StreamDescriptor, StreamKind};
use streamjoin_core::downloader::StreamDownloader;
use streamjoin_core::merger::{MergeError, Merger, Muxer, TempPolicy};
use streamjoin_core::pipeline::{MediaJob, Pipeline, TEMP_DIR_NAME};
use tempfile::tempdir;
use tokio::sync::mpsc;

/// Writes video bytes followed by audio bytes; counts invocations.
#[derive(Clone, Default)]
struct ConcatMuxer {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl Muxer for ConcatMuxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MergeError::MergeFailed {
                status: Some(1),
                stderr: "moov atom not found".into(),
            });
        }
        let mut data = fs::read(video).map_err(MergeError::Spawn)?;
        data.extend(fs::read(audio).map_err(MergeError::Spawn)?);
        fs::write(output, data).map_err(MergeError::Spawn)
    }
}

fn pipeline(order: StreamOrder, muxer: ConcatMuxer, policy: TempPolicy) -> Pipeline<ConcatMuxer> {
    let coordinator = DualStreamCoordinator::new(StreamDownloader::new(common::fast_options()), order);
    Pipeline::new(coordinator, Merger::new(muxer, policy))
}

fn job(dest: &Path, video_url: String, audio_url: String) -> MediaJob {
    MediaJob {
        title: "Demo clip".to_string(),
        video: StreamDescriptor::new(video_url, StreamKind::Video),
        audio: StreamDescriptor::new(audio_url, StreamKind::Audio),
        destination: dest.to_path_buf(),
    }
}

async fn drain(mut rx: mpsc::Receiver<Progress>) -> Vec<Progress> {
    let mut out = Vec::new();
    while let Some(p) = rx.recv().await {
        out.push(p);
    }
    out
}

fn assert_monotonic(events: &[Progress]) {
    assert!(
        events.windows(2).all(|w| w[0].percent <= w[1].percent),
        "progress went backwards: {:?}",
        events.iter().map(|p| p.percent).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn pair_downloads_merges_and_cleans_up() {
    let video = common::body(6 * 1024 * 1024, 11);
    let audio = common::body(512 * 1024, 22);
    let video_url = range_server::start(video.clone());
    let audio_url = range_server::start(audio.clone());
    let dest = tempdir().unwrap();
    let muxer = ConcatMuxer::default();
    let p = pipeline(StreamOrder::AudioFirst, muxer.clone(), TempPolicy::Purge);

    let (tx, rx) = mpsc::channel(256);
    let drained = tokio::spawn(drain(rx));
    let out = p
        .run(&job(dest.path(), video_url, audio_url), Some(tx))
        .await
        .expect("pipeline");

    assert_eq!(out.path, dest.path().join("Demo clip.mp4"));
    assert_eq!(out.video_bytes, video.len() as u64);
    assert_eq!(out.audio_bytes, audio.len() as u64);
    assert_eq!(out.stream_bytes(), (video.len() + audio.len()) as u64);
    let merged = fs::read(&out.path).unwrap();
    assert_eq!(merged.len(), video.len() + audio.len());
    assert!(merged[..video.len()] == video[..]);
    assert!(merged[video.len()..] == audio[..]);
    assert_eq!(muxer.calls.load(Ordering::SeqCst), 1);
    assert!(!dest.path().join(TEMP_DIR_NAME).exists(), "empty temp dir removed");

    let events = drained.await.unwrap();
    assert_monotonic(&events);
    assert!(events.iter().any(|p| p.percent == 90 && p.status == "merging"));
    let last = events.last().unwrap();
    assert_eq!((last.percent, last.status.as_str()), (100, "done"));
    assert!(events
        .iter()
        .filter(|p| p.percent < 90)
        .all(|p| p.status.starts_with("downloading")));
}

#[tokio::test]
async fn concurrent_order_merges_too() {
    let video = common::body(200 * 1024, 1);
    let audio = common::body(100 * 1024, 2);
    let video_url = range_server::start(video.clone());
    let audio_url = range_server::start(audio.clone());
    let dest = tempdir().unwrap();
    let p = pipeline(StreamOrder::Concurrent, ConcatMuxer::default(), TempPolicy::Purge);

    let (tx, rx) = mpsc::channel(256);
    let drained = tokio::spawn(drain(rx));
    let out = p
        .run(&job(dest.path(), video_url, audio_url), Some(tx))
        .await
        .expect("pipeline");

    assert_eq!(out.stream_bytes(), (video.len() + audio.len()) as u64);
    assert_eq!(fs::metadata(&out.path).unwrap().len(), out.stream_bytes());
    assert_monotonic(&drained.await.unwrap());
}

async fn video_failure_removes_audio(order: StreamOrder) {
    let video_server = range_server::start_with_options(
        common::body(64 * 1024, 3),
        RangeServerOptions {
            support_ranges: false,
            ..Default::default()
        },
    );
    let audio_url = range_server::start(common::body(64 * 1024, 4));
    let dest = tempdir().unwrap();
    let muxer = ConcatMuxer::default();
    let p = pipeline(order, muxer.clone(), TempPolicy::Preserve);

    let err = p
        .run(&job(dest.path(), video_server.url.clone(), audio_url), None)
        .await
        .expect_err("video stream cannot be ranged");

    assert!(format!("{err:#}").contains("downloading streams"));
    assert_eq!(muxer.calls.load(Ordering::SeqCst), 0, "merger never runs after a download failure");
    let temp = dest.path().join(TEMP_DIR_NAME);
    assert!(!temp.exists(), "audio file removed, temp dir empty and gone");
    assert!(!dest.path().join("Demo clip.mp4").exists());
}

#[tokio::test]
async fn video_failure_after_audio_removes_audio_file() {
    video_failure_removes_audio(StreamOrder::AudioFirst).await;
}

#[tokio::test]
async fn concurrent_video_failure_removes_audio_file() {
    video_failure_removes_audio(StreamOrder::Concurrent).await;
}

#[tokio::test]
async fn merge_failure_purges_by_default() {
    let dest = tempdir().unwrap();
    let p = pipeline(
        StreamOrder::AudioFirst,
        ConcatMuxer {
            fail: true,
            ..Default::default()
        },
        TempPolicy::Purge,
    );
    let err = p
        .run(
            &job(
                dest.path(),
                range_server::start(common::body(8192, 5)),
                range_server::start(common::body(4096, 6)),
            ),
            None,
        )
        .await
        .expect_err("muxer fails");

    let merge = err.downcast_ref::<MergeError>().expect("merge error in chain");
    assert!(matches!(merge, MergeError::MergeFailed { status: Some(1), .. }));
    assert!(!dest.path().join(TEMP_DIR_NAME).exists());
    assert!(!dest.path().join("Demo clip.mp4").exists());
}

#[tokio::test]
async fn merge_failure_preserves_inputs_when_configured() {
    let dest = tempdir().unwrap();
    let p = pipeline(
        StreamOrder::AudioFirst,
        ConcatMuxer {
            fail: true,
            ..Default::default()
        },
        TempPolicy::Preserve,
    );
    p.run(
        &job(
            dest.path(),
            range_server::start(common::body(8192, 7)),
            range_server::start(common::body(4096, 8)),
        ),
        None,
    )
    .await
    .expect_err("muxer fails");

    let temp = dest.path().join(TEMP_DIR_NAME);
    let mut names: Vec<String> = fs::read_dir(&temp)
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 2, "both elementary files kept: {names:?}");
    assert!(names[0].ends_with(".mp3"));
    assert!(names[1].ends_with(".mp4"));
    assert!(common::part_files(&temp).is_empty());
}
