//! Chunk type and range header math.

/// One contiguous byte span of a resource: `[start, end]` (inclusive end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the plan; also the part file suffix.
    pub index: usize,
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl Chunk {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// Range in the form libcurl expects (`start-end`, no unit prefix).
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}
