//! `streamjoin check-ffmpeg` – verify the multiplexer runs.

use anyhow::{Context, Result};
use streamjoin_core::config::StreamjoinConfig;
use streamjoin_core::merger::FfmpegMuxer;

pub async fn run_check_ffmpeg(cfg: &StreamjoinConfig) -> Result<()> {
    let muxer = FfmpegMuxer::new(&cfg.merge.ffmpeg);
    let program = muxer.program().display().to_string();
    let version = tokio::task::spawn_blocking(move || muxer.detect())
        .await
        .context("ffmpeg check task failed")?
        .with_context(|| format!("{} is not usable; install ffmpeg or set merge.ffmpeg", program))?;
    println!("{}: {}", program, version);
    Ok(())
}
