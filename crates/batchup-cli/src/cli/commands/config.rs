//! `batchup config` – show where the config lives and what is in effect.

use anyhow::{Context, Result};
use batchup_core::config::{self, UploaderConfig};

pub fn run_config(cfg: &UploaderConfig) -> Result<()> {
    let path = config::config_path()?;
    println!("# {}", path.display());
    println!("# endpoint: {}", cfg.endpoint()?);
    let text = toml::to_string_pretty(cfg).context("serialize config")?;
    print!("{}", text);
    Ok(())
}
