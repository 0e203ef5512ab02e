//! CLI for streamjoin.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use streamjoin_core::config;
use streamjoin_core::resolver::DEFAULT_QUALITY;

use commands::{run_check_ffmpeg, run_config, run_fetch, run_get, run_info, FetchArgs, GetArgs};

/// Top-level CLI for streamjoin.
#[derive(Debug, Parser)]
#[command(name = "streamjoin")]
#[command(about = "streamjoin: chunked parallel download of split audio/video streams, merged with ffmpeg", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Resolve a video by id or URL, download both streams and merge them.
    Get {
        /// Video id (BV...) or page URL.
        input: String,

        /// Directory receiving the merged file.
        #[arg(long, short, default_value = ".")]
        dest: PathBuf,

        /// Video quality id (e.g. 80 = 1080P, 64 = 720P).
        #[arg(long, short, default_value_t = DEFAULT_QUALITY)]
        quality: u32,

        /// Download this many consecutive pages, starting at the page in the URL (or 1).
        #[arg(long, default_value = "1", value_name = "N")]
        pages: u32,

        /// Session cookie value; qualities above 720P usually need one.
        #[arg(long, env = "STREAMJOIN_SESSDATA", hide_env_values = true)]
        sessdata: Option<String>,

        /// Print the SHA-256 of each merged file.
        #[arg(long)]
        sha256: bool,

        /// Keep the elementary files if the merge fails.
        #[arg(long)]
        keep_temp: bool,

        /// Fetch audio and video at the same time instead of audio first.
        #[arg(long)]
        concurrent: bool,
    },

    /// Download two explicit stream URLs and merge them.
    Fetch {
        /// Video stream URL.
        #[arg(long)]
        video: String,

        /// Audio stream URL.
        #[arg(long)]
        audio: String,

        /// Output file (".mp4" is appended if missing).
        #[arg(long, short)]
        output: PathBuf,

        /// Extra request header, "Name: value" (repeatable).
        #[arg(long = "header", short = 'H', value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Cookie, "name=value" (repeatable).
        #[arg(long = "cookie", value_name = "NAME=VALUE")]
        cookies: Vec<String>,

        /// Print the SHA-256 of the merged file.
        #[arg(long)]
        sha256: bool,

        /// Fail unless the merged file has this SHA-256 (hex).
        #[arg(long, value_name = "HEX")]
        expect_sha256: Option<String>,

        /// Keep the elementary files if the merge fails.
        #[arg(long)]
        keep_temp: bool,

        /// Fetch audio and video at the same time instead of audio first.
        #[arg(long)]
        concurrent: bool,
    },

    /// Show title, pages and available qualities of a video.
    Info {
        /// Video id (BV...) or page URL.
        input: String,

        /// Page whose qualities are listed.
        #[arg(long, default_value = "1")]
        page: u32,

        /// Session cookie value.
        #[arg(long, env = "STREAMJOIN_SESSDATA", hide_env_values = true)]
        sessdata: Option<String>,
    },

    /// Check that the configured ffmpeg runs.
    CheckFfmpeg,

    /// Print the config file path and its effective contents.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                input,
                dest,
                quality,
                pages,
                sessdata,
                sha256,
                keep_temp,
                concurrent,
            } => {
                let args = GetArgs {
                    input,
                    dest,
                    quality,
                    pages,
                    sessdata,
                    sha256,
                };
                run_get(&commands::apply_overrides(cfg, keep_temp, concurrent), args).await?
            }
            CliCommand::Fetch {
                video,
                audio,
                output,
                headers,
                cookies,
                sha256,
                expect_sha256,
                keep_temp,
                concurrent,
            } => {
                let args = FetchArgs {
                    video,
                    audio,
                    output,
                    headers,
                    cookies,
                    sha256,
                    expect_sha256,
                };
                run_fetch(&commands::apply_overrides(cfg, keep_temp, concurrent), args).await?
            }
            CliCommand::Info {
                input,
                page,
                sessdata,
            } => run_info(&cfg, &input, page, sessdata).await?,
            CliCommand::CheckFfmpeg => run_check_ffmpeg(&cfg).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
