//! `streamjoin config` – show where the config lives and what it holds.

use anyhow::Result;
use streamjoin_core::config::{self, StreamjoinConfig};

pub fn run_config(cfg: &StreamjoinConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
