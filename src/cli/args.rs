//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Local video file to copy into the upload folder
    pub input: PathBuf,
}

/// Arguments for the probe command
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Media file path
    pub input: PathBuf,
}

/// Arguments for the thumbnails command
#[derive(Args, Debug)]
pub struct ThumbnailsArgs {
    /// Uploaded asset id (as printed by `import`)
    pub asset: String,

    /// Number of thumbnails, clamped to the configured bounds
    #[arg(short, long)]
    pub count: Option<String>,
}

/// Arguments for the split command
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Uploaded asset id (as printed by `import`)
    pub asset: String,

    /// Cut marker (HH:MM:SS.ms, MM:SS.ms, or seconds); repeatable
    #[arg(short = 'a', long = "at")]
    pub at: Vec<String>,
}

/// Arguments for the concat command
#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Artifact references in output order
    #[arg(required = true)]
    pub references: Vec<String>,
}

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen port (default: from configuration, 4000)
    #[arg(short, long)]
    pub port: Option<u16>,
}
