//! CLI module for splitx
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_num::number_range;

use crate::config_initialization::CliOverrides;

pub mod args;
pub mod commands;

/// splitx - split videos, sample thumbnails, splice segments
///
/// Drives ffmpeg/ffprobe to cut an uploaded video at given timestamps,
/// extract preview frames and join chosen segments into a new file.
#[derive(Parser, Debug)]
#[command(name = "splitx")]
#[command(about = "Split videos into segments, sample thumbnails and splice segments back together")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Configuration file (default: config/splitx.toml or splitx.toml)
    #[arg(long, global = true, env = "SPLITX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Storage root holding uploads, thumbnails, segments and outputs
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Maximum concurrent ffmpeg processes
    #[arg(long, global = true, value_parser = max_jobs_in_range)]
    pub max_jobs: Option<usize>,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Flags that take part in the configuration hierarchy
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_file: self.config.clone(),
            log_level: self.log_level.clone(),
            root: self.root.clone(),
            max_jobs: self.max_jobs,
            port: match &self.command {
                Commands::Serve(args) => args.port,
                _ => None,
            },
        }
    }
}

fn max_jobs_in_range(s: &str) -> Result<usize, String> {
    number_range(s, 1, 64)
}

/// How reports are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy a local video into the upload folder
    Import(args::ImportArgs),
    /// Show duration and streams of a media file
    Probe(args::ProbeArgs),
    /// Extract a strip of evenly spaced thumbnails
    Thumbnails(args::ThumbnailsArgs),
    /// Cut an uploaded video into consecutive segments
    Split(args::SplitArgs),
    /// Join registered segments, in order, into one output
    Concat(args::ConcatArgs),
    /// Run the HTTP server
    Serve(args::ServeArgs),
}
