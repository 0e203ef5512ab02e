//! Stream descriptors: what to fetch and how to authenticate against the media server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Which elementary stream a descriptor refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Extension of the downloaded elementary file.
    pub fn extension(self) -> &'static str {
        match self {
            StreamKind::Video => "mp4",
            StreamKind::Audio => "mp3",
        }
    }

    /// Elementary file for this stream under `base`: `<base>.<ext>`.
    pub fn elementary_path(self, base: &Path) -> PathBuf {
        let mut o = base.as_os_str().to_owned();
        o.push(".");
        o.push(self.extension());
        PathBuf::from(o)
    }

    pub fn label(self) -> &'static str {
        match self {
            StreamKind::Video => "video",
            StreamKind::Audio => "audio",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One resolved elementary stream: URL plus the headers and cookies the
/// media server expects. Immutable once issued by a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub kind: StreamKind,
}

impl StreamDescriptor {
    pub fn new(url: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            kind,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: &HashMap<String, String>) -> Self {
        for (k, v) in headers {
            self.headers.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// `Cookie` header value (`a=1; b=2`), sorted by name. `None` when there are no cookies.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self.cookies.iter().collect();
        pairs.sort();
        Some(
            pairs
                .into_iter()
                .map(|(k, v)| format!("{}={}", k.trim(), v.trim()))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
