//! Metadata lookup: turns a media id into a title and the two stream
//! descriptors the downloader consumes.

mod bili;
mod bvid;
mod sanitize;

pub use bili::BiliResolver;
pub use bvid::{extract_bvid, page_from_url, quality_label};
pub use sanitize::{page_title, sanitize_title};

use crate::descriptor::StreamDescriptor;

/// Default requested video quality (1080P).
pub const DEFAULT_QUALITY: u32 = 80;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("not a valid media id: {0}")]
    InvalidId(String),

    #[error("metadata request failed: {0}")]
    Http(#[from] curl::Error),

    #[error("metadata request returned HTTP {0}")]
    Status(u32),

    #[error("malformed metadata response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("metadata service error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("page {page} out of range (item has {pages} pages)")]
    PageOutOfRange { page: u32, pages: usize },

    #[error("quality {quality} unavailable (available: {available:?})")]
    QualityUnavailable { quality: u32, available: Vec<u32> },

    #[error("no separate audio/video streams offered")]
    NoStreams,
}

/// What the caller wants resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    /// Session credential (`SESSDATA`); higher qualities need one.
    pub credential: Option<String>,
    /// Media id, e.g. `BV1xx411c7mD`.
    pub id: String,
    pub quality: u32,
    /// 1-based page of a multi-page item.
    pub page: u32,
}

impl MediaRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            credential: None,
            id: id.into(),
            quality: DEFAULT_QUALITY,
            page: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    pub cid: u64,
    pub part: String,
}

/// Title, pages and offered qualities of a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub title: String,
    pub pages: Vec<PageInfo>,
    /// Quality ids offered for the requested page, highest first.
    pub qualities: Vec<u32>,
}

/// A resolved page: file-name-safe title plus both stream descriptors.
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub title: String,
    pub qualities: Vec<u32>,
    pub video: StreamDescriptor,
    pub audio: StreamDescriptor,
}

/// Metadata service seam. Implementations block; async callers run them on
/// the blocking pool.
pub trait StreamResolver: Send + Sync {
    fn inspect(&self, request: &MediaRequest) -> Result<MediaInfo, ResolveError>;

    fn resolve(&self, request: &MediaRequest) -> Result<ResolvedMedia, ResolveError>;
}
