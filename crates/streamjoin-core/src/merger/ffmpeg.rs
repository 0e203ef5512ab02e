//! ffmpeg stream-copy multiplexer.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{MergeError, Muxer};

/// Bytes of ffmpeg stderr kept in a `MergeFailed` error.
const STDERR_TAIL: usize = 4096;

#[derive(Debug, Clone)]
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegMuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs `<program> -version` and returns the first line of its output.
    pub fn detect(&self) -> Result<String, MergeError> {
        let output = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(MergeError::Spawn)?;
        if !output.status.success() {
            return Err(MergeError::MergeFailed {
                status: output.status.code(),
                stderr: tail(&output.stderr),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl Muxer for FfmpegMuxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), MergeError> {
        tracing::debug!(
            program = %self.program.display(),
            video = %video.display(),
            audio = %audio.display(),
            output = %output.display(),
            "running multiplexer"
        );
        let result = Command::new(&self.program)
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-c:v", "copy", "-c:a", "copy", "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(MergeError::Spawn)?;

        if !result.status.success() {
            return Err(MergeError::MergeFailed {
                status: result.status.code(),
                stderr: tail(&result.stderr),
            });
        }
        Ok(())
    }
}

/// Last `STDERR_TAIL` bytes of `buf` as lossy UTF-8.
fn tail(buf: &[u8]) -> String {
    let start = buf.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&buf[start..]).trim().to_string()
}
