//! Shared libcurl handle setup for probes, chunk fetches and API calls.

use std::collections::HashMap;
use std::time::Duration;

use crate::descriptor::StreamDescriptor;

/// Browser-like user agent sent when a descriptor carries none.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// Referer the media CDN expects.
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com";

/// Transport settings shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Whole-request limit for HEAD probes and API lookups. Chunk GETs use
    /// the retry policy's per-attempt timeout instead.
    pub request_timeout: Duration,
    /// Receive buffer size handed to libcurl (None = libcurl default).
    pub buffer_size: Option<usize>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30),
            buffer_size: None,
        }
    }
}

/// The fixed `User-Agent`/`referer` header set used for every request.
pub fn default_headers(user_agent: &str, referer: &str) -> HashMap<String, String> {
    let mut h = HashMap::new();
    h.insert("User-Agent".to_string(), user_agent.to_string());
    h.insert("referer".to_string(), referer.to_string());
    h
}

/// Builds an easy handle for `url` with the given headers and optional cookie string.
pub(crate) fn easy_for(
    url: &str,
    headers: &HashMap<String, String>,
    cookie: Option<&str>,
    opts: &HttpOptions,
) -> Result<curl::easy::Easy, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    if let Some(sz) = opts.buffer_size {
        easy.buffer_size(sz)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !headers.is_empty() {
        easy.http_headers(list)?;
    }
    if let Some(c) = cookie {
        easy.cookie(c)?;
    }
    Ok(easy)
}

/// Builds an easy handle for a stream descriptor (headers + cookies).
pub(crate) fn easy_for_stream(
    descriptor: &StreamDescriptor,
    opts: &HttpOptions,
) -> Result<curl::easy::Easy, curl::Error> {
    let cookie = descriptor.cookie_header();
    easy_for(&descriptor.url, &descriptor.headers, cookie.as_deref(), opts)
}

/// Status code from a response status line (`HTTP/1.1 206 Partial Content`).
pub(crate) fn parse_status_line(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}
