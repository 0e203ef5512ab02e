//! `streamjoin fetch` – download two explicit stream URLs and merge them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use streamjoin_core::checksum;
use streamjoin_core::config::StreamjoinConfig;
use streamjoin_core::descriptor::{StreamDescriptor, StreamKind};
use streamjoin_core::http;
use streamjoin_core::pipeline::{MediaJob, Pipeline};

use super::progress::{format_size, spawn_printer};

#[derive(Debug)]
pub struct FetchArgs {
    pub video: String,
    pub audio: String,
    pub output: PathBuf,
    pub headers: Vec<String>,
    pub cookies: Vec<String>,
    pub sha256: bool,
    pub expect_sha256: Option<String>,
}

/// Parse `Name: value` header arguments.
pub(crate) fn parse_headers(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for h in raw {
        match h.split_once(':') {
            Some((k, v)) if !k.trim().is_empty() => {
                out.insert(k.trim().to_string(), v.trim().to_string());
            }
            _ => bail!("invalid header (expected \"Name: value\"): {}", h),
        }
    }
    Ok(out)
}

/// Parse `name=value` cookie arguments.
pub(crate) fn parse_cookies(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut out = HashMap::new();
    for c in raw {
        match c.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => {
                out.insert(k.trim().to_string(), v.trim().to_string());
            }
            _ => bail!("invalid cookie (expected name=value): {}", c),
        }
    }
    Ok(out)
}

/// Split `dir/name[.mp4]` into destination directory and title.
pub(crate) fn split_output(output: &Path) -> Result<(PathBuf, String)> {
    let Some(name) = output.file_name().and_then(|n| n.to_str()) else {
        bail!("invalid output path: {}", output.display());
    };
    let title = name.strip_suffix(".mp4").unwrap_or(name);
    if title.is_empty() {
        bail!("invalid output path: {}", output.display());
    }
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, title.to_string()))
}

pub async fn run_fetch(cfg: &StreamjoinConfig, args: FetchArgs) -> Result<()> {
    let mut headers = http::default_headers(&cfg.http.user_agent, &cfg.http.referer);
    headers.extend(parse_headers(&args.headers)?);
    let cookies = parse_cookies(&args.cookies)?;
    let (destination, title) = split_output(&args.output)?;
    std::fs::create_dir_all(&destination)?;

    let descriptor = |url: String, kind| {
        let mut d = StreamDescriptor::new(url, kind).with_headers(&headers);
        for (k, v) in &cookies {
            d = d.with_cookie(k.as_str(), v.as_str());
        }
        d
    };
    let job = MediaJob {
        title,
        video: descriptor(args.video, StreamKind::Video),
        audio: descriptor(args.audio, StreamKind::Audio),
        destination,
    };

    let (tx, printer) = spawn_printer(job.title.clone());
    let result = Pipeline::from_config(cfg).run(&job, Some(tx)).await;
    let _ = printer.await;
    let merged = result?;

    println!(
        "saved {} ({})",
        merged.path.display(),
        format_size(merged.stream_bytes())
    );
    if let Some(expected) = &args.expect_sha256 {
        let digest = checksum::verify_sha256(&merged.path, expected)?;
        println!("{}  {}  OK", digest, merged.path.display());
    } else if args.sha256 {
        let digest = checksum::sha256_path(&merged.path)?;
        println!("{}  {}", digest, merged.path.display());
    }
    Ok(())
}
