//! streamjoin core: chunked ranged downloads of split audio/video streams,
//! reassembly, and ffmpeg stream-copy merging.

pub mod checksum;
pub mod config;
pub mod coordinator;
pub mod descriptor;
pub mod downloader;
pub mod fetch_head;
pub mod http;
pub mod logging;
pub mod merger;
pub mod pipeline;
pub mod planner;
pub mod resolver;
pub mod retry;
pub mod storage;
