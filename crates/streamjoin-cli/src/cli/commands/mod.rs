//! CLI command handlers. Each command is in its own file.

mod check_ffmpeg;
mod config;
mod fetch;
mod get;
mod info;
mod progress;

pub use check_ffmpeg::run_check_ffmpeg;
pub use config::run_config;
pub use fetch::{run_fetch, FetchArgs};
pub use get::{run_get, GetArgs};
pub use info::run_info;

use streamjoin_core::config::StreamjoinConfig;
use streamjoin_core::coordinator::StreamOrder;
use streamjoin_core::http;
use streamjoin_core::resolver::BiliResolver;

/// Command-line flags take precedence over the config file.
pub(crate) fn apply_overrides(
    mut cfg: StreamjoinConfig,
    keep_temp: bool,
    concurrent: bool,
) -> StreamjoinConfig {
    if keep_temp {
        cfg.merge.keep_temp_on_failure = true;
    }
    if concurrent {
        cfg.order = StreamOrder::Concurrent;
    }
    cfg
}

pub(crate) fn resolver(cfg: &StreamjoinConfig) -> BiliResolver {
    BiliResolver::new(
        http::default_headers(&cfg.http.user_agent, &cfg.http.referer),
        cfg.http.options(),
    )
}
