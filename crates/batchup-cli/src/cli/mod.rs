//! CLI for the batchup upload queue.

mod commands;

use anyhow::Result;
use batchup_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_config, run_upload, UploadArgs};

/// Top-level CLI for batchup.
#[derive(Debug, Parser)]
#[command(name = "batchup")]
#[command(about = "batchup: bounded-concurrency multipart file uploader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload files to the configured endpoint.
    Upload {
        /// Files to upload, in queue order.
        #[arg(required = true, value_name = "FILES")]
        files: Vec<PathBuf>,

        /// Upload up to N files at once (defaults to `concurrency` from the config file).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Full upload URL, overriding `server_url` + `upload_path`.
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Re-queue failed uploads up to N more times.
        #[arg(long, default_value = "0", value_name = "N")]
        retries: u32,
    },

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                files,
                jobs,
                endpoint,
                retries,
            } => {
                let args = UploadArgs {
                    files,
                    jobs,
                    endpoint,
                    retries,
                };
                run_upload(cfg, args).await?;
            }
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
