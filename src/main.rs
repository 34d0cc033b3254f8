//! splitx
//!
//! HTTP and command-line front end for splitting videos into segments,
//! sampling thumbnails and splicing segments back together.
//!
//! # Usage
//!
//! ```bash
//! splitx import holiday.mp4
//! splitx split 1718000000000_42.mp4 --at 00:01:00 --at 95.5
//! splitx thumbnails 1718000000000_42.mp4 --count 12
//! splitx concat /segments/1718000000000_42.mp4/5d1c0e9a27b4/segment_2.mp4 \
//!     /segments/1718000000000_42.mp4/5d1c0e9a27b4/segment_0.mp4
//! splitx serve --port 4000
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use splitx::adapters::init_tracing;
use splitx::cli::{commands, Cli};
use splitx::config_initialization::initialize_configuration_hierarchy;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration_hierarchy(&cli.overrides())
        .context("Failed to load configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;
    debug!(root = %config.storage.root.display(), "Configuration loaded");

    commands::run(cli.command, cli.format, Arc::new(config)).await
}
