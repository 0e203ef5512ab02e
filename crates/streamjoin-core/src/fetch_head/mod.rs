//! HTTP HEAD size probe.
//!
//! Uses the curl crate (libcurl) to fetch response headers and read
//! `Content-Length` before any bandwidth is spent on ranged GETs.

mod parse;

use std::str;

use crate::descriptor::StreamDescriptor;
use crate::http::{self, HttpOptions};
use crate::retry::FetchError;

/// Result of a HEAD request: key headers needed for a chunked download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `Content-Type` value if present.
    pub content_type: Option<String>,
}

impl HeadResult {
    /// Usable length: present and non-zero.
    pub fn usable_length(&self) -> Option<u64> {
        self.content_length.filter(|&n| n > 0)
    }
}

/// Performs a HEAD request with the descriptor's headers and cookies.
///
/// Follows redirects. Runs in the current thread; call from `spawn_blocking`
/// in async code.
pub fn probe(descriptor: &StreamDescriptor, opts: &HttpOptions) -> Result<HeadResult, FetchError> {
    let mut head = HeadResult::default();

    let mut easy = http::easy_for_stream(descriptor, opts)?;
    easy.nobody(true)?;
    easy.timeout(opts.request_timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                head.absorb_line(s);
            }
            true
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    Ok(head)
}
