//! `streamjoin get` – resolve a video, download its streams and merge them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use streamjoin_core::checksum;
use streamjoin_core::config::StreamjoinConfig;
use streamjoin_core::merger::FfmpegMuxer;
use streamjoin_core::pipeline::{MediaJob, MergedMedia, Pipeline};
use streamjoin_core::resolver::{
    extract_bvid, page_from_url, quality_label, sanitize_title, BiliResolver, MediaInfo,
    MediaRequest, StreamResolver,
};

use super::progress::{format_size, spawn_printer};

#[derive(Debug)]
pub struct GetArgs {
    pub input: String,
    pub dest: PathBuf,
    pub quality: u32,
    pub pages: u32,
    pub sessdata: Option<String>,
    pub sha256: bool,
}

pub async fn run_get(cfg: &StreamjoinConfig, args: GetArgs) -> Result<()> {
    let Some(id) = extract_bvid(&args.input) else {
        bail!("not a valid video id or URL: {}", args.input);
    };
    if args.pages == 0 {
        bail!("--pages must be at least 1");
    }
    let first_page = page_from_url(&args.input).unwrap_or(1);

    let resolver = Arc::new(super::resolver(cfg));
    let mut request = MediaRequest {
        credential: args.sessdata.clone(),
        id,
        quality: args.quality,
        page: first_page,
    };

    // Several pages go into a directory named after the item.
    let dest = if args.pages > 1 {
        let info = blocking_inspect(&resolver, &request).await?;
        let dir = args.dest.join(sanitize_title(&info.title));
        std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        dir
    } else {
        std::fs::create_dir_all(&args.dest)
            .with_context(|| format!("create {}", args.dest.display()))?;
        args.dest.clone()
    };

    let pipeline = Pipeline::from_config(cfg);
    let mut failed: Vec<u32> = Vec::new();

    for page in first_page..first_page + args.pages {
        request.page = page;
        println!(
            "{} page {}: quality {} ({})",
            request.id,
            page,
            request.quality,
            quality_label(request.quality).unwrap_or("?")
        );
        match get_page(&pipeline, &resolver, &request, &dest).await {
            Ok(merged) => {
                println!(
                    "  saved {} ({})",
                    merged.path.display(),
                    format_size(merged.stream_bytes())
                );
                if args.sha256 {
                    let digest = checksum::sha256_path(&merged.path)?;
                    println!("  {}  {}", digest, merged.path.display());
                }
            }
            Err(e) => {
                eprintln!("  page {} failed: {:#}", page, e);
                tracing::warn!(id = %request.id, page, "page failed: {:#}", e);
                failed.push(page);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{}: failed pages {:?}", request.id, failed);
    }
    Ok(())
}

async fn get_page(
    pipeline: &Pipeline<FfmpegMuxer>,
    resolver: &Arc<BiliResolver>,
    request: &MediaRequest,
    dest: &Path,
) -> Result<MergedMedia> {
    let r = Arc::clone(resolver);
    let req = request.clone();
    let media = tokio::task::spawn_blocking(move || r.resolve(&req))
        .await
        .context("resolver task failed")?
        .context("resolving streams")?;

    let job = MediaJob {
        title: media.title,
        video: media.video,
        audio: media.audio,
        destination: dest.to_path_buf(),
    };
    let (tx, printer) = spawn_printer(format!("P{}", request.page));
    let result = pipeline.run(&job, Some(tx)).await;
    let _ = printer.await;
    result
}

async fn blocking_inspect(
    resolver: &Arc<BiliResolver>,
    request: &MediaRequest,
) -> Result<MediaInfo> {
    let r = Arc::clone(resolver);
    let req = request.clone();
    tokio::task::spawn_blocking(move || r.inspect(&req))
        .await
        .context("resolver task failed")?
        .context("looking up video")
}
