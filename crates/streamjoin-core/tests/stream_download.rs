//! Integration tests: one stream against a local range server.

mod common;

use std::time::{Duration, Instant};

use common::range_server::{self, RangeServerOptions};
use streamjoin_core::descriptor::{StreamDescriptor, StreamKind};
use streamjoin_core::downloader::{DownloadError, StreamDownloader, StreamProgress};
use streamjoin_core::retry::FetchError;
use tempfile::tempdir;
use tokio::sync::mpsc;

const MIB: usize = 1024 * 1024;

async fn collect(mut rx: mpsc::Receiver<StreamProgress>) -> Vec<StreamProgress> {
    let mut out = Vec::new();
    while let Some(p) = rx.recv().await {
        out.push(p);
    }
    out
}

#[tokio::test]
async fn ten_mib_in_two_chunks_matches_body() {
    let body = common::body(10 * MIB, 7);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let base = dir.path().join("1700000000");

    let downloader = StreamDownloader::new(common::fast_options());
    let (tx, rx) = mpsc::channel(256);
    let collector = tokio::spawn(collect(rx));
    let done = downloader
        .download(&StreamDescriptor::new(url, StreamKind::Video), &base, Some(tx))
        .await
        .expect("download");

    assert_eq!(done.chunk_count, 2);
    assert_eq!(done.total_bytes, body.len() as u64);
    assert_eq!(done.path, dir.path().join("1700000000.mp4"));
    let content = std::fs::read(&done.path).unwrap();
    assert_eq!(content.len(), body.len(), "file size must match");
    assert!(content == body, "file content must match");
    assert!(common::part_files(dir.path()).is_empty());

    let events = collector.await.unwrap();
    let last = events.last().expect("at least the final event");
    assert_eq!(last.percent(), 100);
    assert!(
        events.windows(2).all(|w| w[0].percent() <= w[1].percent()),
        "progress must not decrease"
    );
}

#[tokio::test]
async fn many_chunks_bounded_concurrency() {
    let body = common::body(300 * 1024, 3);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let base = dir.path().join("x");

    let mut options = common::fast_options();
    options.planner = streamjoin_core::planner::ChunkPlanner::new(32, 4096);
    options.max_concurrent = 3;
    let done = StreamDownloader::new(options)
        .download(&StreamDescriptor::new(url, StreamKind::Audio), &base, None)
        .await
        .expect("download");

    assert_eq!(done.chunk_count, 32);
    assert_eq!(done.path, dir.path().join("x.mp3"));
    assert!(std::fs::read(&done.path).unwrap() == body);
    assert!(common::part_files(dir.path()).is_empty());
}

#[tokio::test]
async fn range_ignored_exhausts_five_attempts_and_cleans_up() {
    let body = common::body(10 * MIB, 1);
    let server = range_server::start_with_options(
        body,
        RangeServerOptions {
            support_ranges: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let base = dir.path().join("v");

    let err = StreamDownloader::new(common::fast_options())
        .download(&StreamDescriptor::new(server.url.clone(), StreamKind::Video), &base, None)
        .await
        .expect_err("server ignores ranges");

    match &err {
        DownloadError::ChunkExhausted {
            attempts, last, kind, ..
        } => {
            assert_eq!(*attempts, 5);
            assert_eq!(*kind, StreamKind::Video);
            assert!(matches!(last, FetchError::UnsupportedRange(200)), "last: {last:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_unsupported_range());
    assert_eq!(err.last_status(), Some(200));
    assert!(server.gets() >= 5);
    assert!(!dir.path().join("v.mp4").exists(), "no final file after failure");
    assert!(common::part_files(dir.path()).is_empty(), "no part files after failure");
}

#[tokio::test]
async fn one_rejected_chunk_fails_the_stream() {
    let body = common::body(10 * MIB, 2);
    let server = range_server::start_with_options(
        body,
        RangeServerOptions {
            ignore_range_from: Some(5 * MIB as u64),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let base = dir.path().join("v");

    let err = StreamDownloader::new(common::fast_options())
        .download(&StreamDescriptor::new(server.url.clone(), StreamKind::Video), &base, None)
        .await
        .expect_err("second chunk never honoured");

    assert!(
        matches!(err, DownloadError::ChunkExhausted { index: 1, attempts: 5, .. }),
        "unexpected: {err:?}"
    );
    assert!(!dir.path().join("v.mp4").exists());
    assert!(common::part_files(dir.path()).is_empty());
}

#[tokio::test]
async fn missing_length_is_size_unknown_without_any_get() {
    let server = range_server::start_with_options(
        common::body(4096, 0),
        RangeServerOptions {
            report_length: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let base = dir.path().join("a");

    let err = StreamDownloader::new(common::fast_options())
        .download(&StreamDescriptor::new(server.url.clone(), StreamKind::Audio), &base, None)
        .await
        .expect_err("no length");

    assert!(matches!(err, DownloadError::SizeUnknown(StreamKind::Audio)));
    assert_eq!(server.gets(), 0, "no range fetch before the size is known");
    assert!(!dir.path().join("a.mp3").exists());
}

#[tokio::test]
async fn blocked_head_is_probe_error() {
    let server = range_server::start_with_options(
        common::body(4096, 0),
        RangeServerOptions {
            head_allowed: false,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let err = StreamDownloader::new(common::fast_options())
        .download(
            &StreamDescriptor::new(server.url.clone(), StreamKind::Video),
            &dir.path().join("v"),
            None,
        )
        .await
        .expect_err("HEAD blocked");

    assert!(matches!(err, DownloadError::Probe { .. }));
    assert_eq!(err.last_status(), Some(405));
    assert_eq!(server.gets(), 0);
}

#[tokio::test]
async fn transient_503_is_retried() {
    let body = common::body(10 * MIB, 9);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            fail_first_gets: 2,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let done = StreamDownloader::new(common::fast_options())
        .download(
            &StreamDescriptor::new(server.url.clone(), StreamKind::Video),
            &dir.path().join("v"),
            None,
        )
        .await
        .expect("retries recover");

    assert!(std::fs::read(&done.path).unwrap() == body);
    assert_eq!(server.gets(), 4, "two throttled GETs plus one per chunk");
    assert!(common::part_files(dir.path()).is_empty());
}

#[tokio::test]
async fn body_cut_short_is_retried_without_double_counting() {
    let body = common::body(10 * MIB, 13);
    let server = range_server::start_with_options(
        body.clone(),
        RangeServerOptions {
            truncate_first_gets: 2,
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();

    let (tx, rx) = mpsc::channel(256);
    let collector = tokio::spawn(collect(rx));
    let done = StreamDownloader::new(common::fast_options())
        .download(
            &StreamDescriptor::new(server.url.clone(), StreamKind::Video),
            &dir.path().join("v"),
            Some(tx),
        )
        .await
        .expect("short bodies are retried");

    assert!(std::fs::read(&done.path).unwrap() == body, "file content must match");
    assert_eq!(server.gets(), 4, "each chunk cut once, then fetched whole");
    assert!(common::part_files(dir.path()).is_empty());

    let events = collector.await.unwrap();
    assert!(
        events.iter().all(|p| p.bytes_done <= p.total_bytes),
        "rewritten spans counted twice: {:?}",
        events.iter().map(|p| p.bytes_done).collect::<Vec<_>>()
    );
    assert_eq!(events.last().map(|p| p.percent()), Some(100));
}

#[tokio::test]
async fn slow_head_hits_the_request_timeout() {
    let server = range_server::start_with_options(
        common::body(4096, 0),
        RangeServerOptions {
            head_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        },
    );
    let dir = tempdir().unwrap();
    let mut options = common::fast_options();
    options.http.request_timeout = Duration::from_secs(1);

    let started = Instant::now();
    let err = StreamDownloader::new(options)
        .download(
            &StreamDescriptor::new(server.url.clone(), StreamKind::Audio),
            &dir.path().join("a"),
            None,
        )
        .await
        .expect_err("HEAD never answers in time");

    assert!(matches!(err, DownloadError::Probe { .. }), "unexpected: {err:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(server.gets(), 0);
}

#[tokio::test]
async fn leftover_parts_removed_before_start() {
    let body = common::body(64 * 1024, 5);
    let url = range_server::start(body.clone());
    let dir = tempdir().unwrap();
    let base = dir.path().join("v");
    let stray = dir.path().join("v.mp4.part7");
    std::fs::write(&stray, b"old run").unwrap();

    let done = StreamDownloader::new(common::fast_options())
        .download(&StreamDescriptor::new(url, StreamKind::Video), &base, None)
        .await
        .expect("download");

    assert!(std::fs::read(&done.path).unwrap() == body);
    assert!(!stray.exists());
    assert!(common::part_files(dir.path()).is_empty());
}
