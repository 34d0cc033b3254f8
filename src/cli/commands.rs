//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::adapters::FFprobeAdapter;
use crate::app::asset_catalog::AssetCatalog;
use crate::app::{AppContainer, DefaultAppContainer, SplitRequest, ThumbnailRequest};
use crate::cli::args::{ConcatArgs, ImportArgs, ProbeArgs, SplitArgs, ThumbnailsArgs};
use crate::cli::{Commands, OutputFormat};
use crate::config_initialization::AppConfig;
use crate::domain::model::{MediaInfo, TimeSpec};
use crate::planner::CountParam;
use crate::probe::AssetInspector;
use crate::server;

/// Run one command against the effective configuration
pub async fn run(command: Commands, format: OutputFormat, config: Arc<AppConfig>) -> Result<()> {
    match command {
        Commands::Probe(args) => probe(&args, format, &config).await,
        Commands::Import(args) => import(args, format, open(&config).await?).await,
        Commands::Thumbnails(args) => thumbnails(args, format, open(&config).await?).await,
        Commands::Split(args) => split(args, format, open(&config).await?).await,
        Commands::Concat(args) => concat(args, format, open(&config).await?).await,
        Commands::Serve(_) => server::serve(open(&config).await?).await,
    }
}

/// Open storage and wire the application
async fn open(config: &Arc<AppConfig>) -> Result<Arc<dyn AppContainer>> {
    let container = DefaultAppContainer::new(Arc::clone(config))
        .await
        .with_context(|| format!("Failed to open storage at {}", config.storage.root.display()))?;
    Ok(Arc::new(container))
}

/// Execute the probe command
async fn probe(args: &ProbeArgs, format: OutputFormat, config: &AppConfig) -> Result<()> {
    let inspector = AssetInspector::new(Arc::new(FFprobeAdapter::new(
        config.media.ffprobe_path.clone(),
    )));
    let info = inspector
        .inspect(&args.input)
        .await
        .with_context(|| format!("Failed to probe {}", args.input.display()))?;
    emit(format, &probe_report(&info))
}

fn probe_report(info: &MediaInfo) -> Value {
    json!({
        "duration": info.duration,
        "format": info.format,
        "video": info.primary_video_stream(),
        "has_audio": info.has_audio(),
        "streams": info.streams,
    })
}

/// Execute the import command
async fn import(args: ImportArgs, format: OutputFormat, container: Arc<dyn AppContainer>) -> Result<()> {
    let asset = container
        .catalog()
        .import(&args.input)
        .await
        .with_context(|| format!("Failed to import {}", args.input.display()))?;
    info!("Imported {} as {}", args.input.display(), asset.id());
    emit(
        format,
        &json!({ "filename": asset.id(), "url": AssetCatalog::public_url(asset.id()) }),
    )
}

/// Execute the thumbnails command
async fn thumbnails(
    args: ThumbnailsArgs,
    format: OutputFormat,
    container: Arc<dyn AppContainer>,
) -> Result<()> {
    let response = container
        .thumbnail_interactor()
        .execute(ThumbnailRequest {
            asset_id: args.asset.clone(),
            count: args.count.map(CountParam::Text),
        })
        .await
        .with_context(|| format!("Failed to extract thumbnails for {}", args.asset))?;

    let summary = response.batch.summary();
    info!("Thumbnails for {}: {}", args.asset, summary);
    emit(
        format,
        &json!({
            "thumbs": response.references(),
            "folder": response.folder,
            "instants": response.plan.instants,
            "slots": response.batch.map(|a| a.reference).slots,
            "summary": summary.to_string(),
        }),
    )
}

/// Execute the split command
async fn split(args: SplitArgs, format: OutputFormat, container: Arc<dyn AppContainer>) -> Result<()> {
    let markers = args
        .at
        .iter()
        .map(|raw| {
            TimeSpec::parse(raw)
                .map(|t| t.as_seconds())
                .with_context(|| format!("Invalid marker '{}'", raw))
        })
        .collect::<Result<Vec<f64>>>()?;

    let response = container
        .split_interactor()
        .execute(SplitRequest {
            asset_id: args.asset.clone(),
            markers,
        })
        .await
        .with_context(|| format!("Failed to split {}", args.asset))?;

    let summary = response.batch.summary();
    info!("Split {}: {}", args.asset, summary);
    emit(
        format,
        &json!({
            "segments": response.references(),
            "ranges": response.plan.ranges,
            "slots": response.batch.map(|a| a.reference).slots,
            "summary": summary.to_string(),
        }),
    )
}

/// Execute the concat command
async fn concat(args: ConcatArgs, format: OutputFormat, container: Arc<dyn AppContainer>) -> Result<()> {
    let artifact = container
        .concat_interactor()
        .assemble_output(&args.references)
        .await
        .context("Failed to assemble output")?;
    info!("Assembled {} inputs into {}", args.references.len(), artifact.reference);
    emit(
        format,
        &json!({ "output": artifact.reference, "path": artifact.path }),
    )
}

/// Print a report to stdout
fn emit<T: Serialize>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize report to JSON")?
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("Failed to serialize report to YAML")?
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
