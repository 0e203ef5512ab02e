//! `streamjoin info` – title, pages and qualities of a video.

use anyhow::{bail, Context, Result};
use streamjoin_core::config::StreamjoinConfig;
use streamjoin_core::resolver::{extract_bvid, quality_label, MediaRequest, StreamResolver};

pub async fn run_info(
    cfg: &StreamjoinConfig,
    input: &str,
    page: u32,
    sessdata: Option<String>,
) -> Result<()> {
    let Some(id) = extract_bvid(input) else {
        bail!("not a valid video id or URL: {}", input);
    };
    let request = MediaRequest {
        credential: sessdata,
        page,
        ..MediaRequest::new(id)
    };
    let resolver = super::resolver(cfg);
    let info = tokio::task::spawn_blocking(move || resolver.inspect(&request))
        .await
        .context("resolver task failed")??;

    println!("{}", info.title);
    println!("{:<6} {:<12} {}", "PAGE", "CID", "PART");
    for p in &info.pages {
        println!("{:<6} {:<12} {}", p.page, p.cid, p.part);
    }
    println!("qualities (page {}):", page);
    for q in &info.qualities {
        println!("  {:<4} {}", q, quality_label(*q).unwrap_or("-"));
    }
    Ok(())
}
