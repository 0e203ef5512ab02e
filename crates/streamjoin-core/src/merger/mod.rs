//! Merge step: combines the video and audio elementary files into one
//! container through a [`Muxer`], then disposes of the inputs.
//!
//! On success both inputs are removed. On any failure (missing input,
//! multiplexer failure, spawn failure) the configured [`TempPolicy`] decides
//! whether the inputs are removed or kept for diagnosis.

mod ffmpeg;

pub use ffmpeg::FfmpegMuxer;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extension of the merged container.
pub const OUTPUT_EXTENSION: &str = "mp4";

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("merge input missing or empty: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("multiplexer exited with {}: {stderr}", exit_label(.status))]
    MergeFailed {
        /// Exit code; `None` when terminated by a signal.
        status: Option<i32>,
        stderr: String,
    },

    #[error("failed to start multiplexer: {0}")]
    Spawn(#[source] io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// What happens to the elementary files when a merge fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TempPolicy {
    /// Remove both inputs.
    #[default]
    Purge,
    /// Keep both inputs on disk.
    Preserve,
}

/// Combines one video and one audio file into `output` without re-encoding.
pub trait Muxer: Send + Sync {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError>;
}

pub struct Merger<M> {
    muxer: M,
    policy: TempPolicy,
}

impl<M: Muxer> Merger<M> {
    pub fn new(muxer: M, policy: TempPolicy) -> Self {
        Self { muxer, policy }
    }

    pub fn muxer(&self) -> &M {
        &self.muxer
    }

    pub fn policy(&self) -> TempPolicy {
        self.policy
    }

    /// Merges `video` and `audio` into `<output_base>.mp4` and returns its path.
    pub fn merge(&self, video: &Path, audio: &Path, output_base: &Path) -> Result<PathBuf, MergeError> {
        let output = output_path(output_base);

        let result = check_input(video)
            .and_then(|_| check_input(audio))
            .and_then(|_| self.muxer.mux(video, audio, &output));

        match result {
            Ok(()) => {
                remove_quiet(video);
                remove_quiet(audio);
                tracing::info!(output = %output.display(), "merge complete");
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(error = %e, policy = ?self.policy, "merge failed");
                if !matches!(e, MergeError::MissingInput(_)) {
                    remove_quiet(&output);
                }
                if self.policy == TempPolicy::Purge {
                    remove_quiet(video);
                    remove_quiet(audio);
                }
                Err(e)
            }
        }
    }
}

/// `<base>.mp4`, appended so titles containing dots keep their full name.
pub fn output_path(base: &Path) -> PathBuf {
    let mut o = base.as_os_str().to_owned();
    o.push(".");
    o.push(OUTPUT_EXTENSION);
    PathBuf::from(o)
}

fn check_input(path: &Path) -> Result<(), MergeError> {
    match fs::metadata(path) {
        Ok(m) if m.is_file() && m.len() > 0 => Ok(()),
        _ => Err(MergeError::MissingInput(path.to_path_buf())),
    }
}

fn remove_quiet(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}
