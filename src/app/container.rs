use std::sync::Arc;

use crate::adapters::{FFmpegAdapter, FFprobeAdapter};
use crate::app::{
    asset_catalog::AssetCatalog, concat_interactor::ConcatInteractor,
    split_interactor::SplitInteractor, thumbnail_interactor::ThumbnailInteractor,
};
use crate::config_initialization::AppConfig;
use crate::domain::errors::DomainError;
use crate::engine::BatchRunner;
use crate::output::ArtifactRegistry;
use crate::planner::{ThumbnailSampler, TimelinePartitioner};
use crate::ports::{ExecutePort, ProbePort};
use crate::probe::AssetInspector;

pub trait AppContainer: Send + Sync {
    fn config(&self) -> Arc<AppConfig>;
    fn catalog(&self) -> Arc<AssetCatalog>;
    fn inspector(&self) -> Arc<AssetInspector>;
    fn registry(&self) -> Arc<ArtifactRegistry>;
    fn thumbnail_interactor(&self) -> Arc<ThumbnailInteractor>;
    fn split_interactor(&self) -> Arc<SplitInteractor>;
    fn concat_interactor(&self) -> Arc<ConcatInteractor>;
}

pub struct DefaultAppContainer {
    config: Arc<AppConfig>,
    catalog: Arc<AssetCatalog>,
    inspector: Arc<AssetInspector>,
    registry: Arc<ArtifactRegistry>,
    thumbnail_interactor: Arc<ThumbnailInteractor>,
    split_interactor: Arc<SplitInteractor>,
    concat_interactor: Arc<ConcatInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffprobe/ffmpeg adapters named in `config`
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, DomainError> {
        let probe_port = Arc::new(FFprobeAdapter::new(config.media.ffprobe_path.clone()));
        let execute_port = Arc::new(FFmpegAdapter::new(config.media.ffmpeg_path.clone()));
        Self::with_ports(config, probe_port, execute_port).await
    }

    /// Wire the application around the given media tool ports
    pub async fn with_ports(
        config: Arc<AppConfig>,
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
    ) -> Result<Self, DomainError> {
        let registry = Arc::new(ArtifactRegistry::open(&config.storage).await?);
        let catalog = Arc::new(AssetCatalog::new(config.storage.uploads_path()));
        let inspector = Arc::new(AssetInspector::new(Arc::clone(&probe_port)));

        // one permit pool for every ffmpeg run, so the limit holds across requests
        let runner = BatchRunner::new(config.jobs.max_concurrent);

        let thumbnail_interactor = Arc::new(ThumbnailInteractor::new(
            Arc::clone(&catalog),
            Arc::clone(&inspector),
            Arc::clone(&execute_port),
            Arc::clone(&registry),
            runner.clone(),
            ThumbnailSampler::new(config.planning.sampler_limits()),
            config.media.thumbnail_max_width,
        ));

        let split_interactor = Arc::new(SplitInteractor::new(
            Arc::clone(&catalog),
            Arc::clone(&inspector),
            Arc::clone(&execute_port),
            Arc::clone(&registry),
            runner.clone(),
            TimelinePartitioner::new(config.planning.min_segment),
            config.media.output_extension.clone(),
        ));

        let concat_interactor = Arc::new(ConcatInteractor::new(
            Arc::clone(&execute_port),
            Arc::clone(&registry),
            runner,
            config.media.output_extension.clone(),
        ));

        Ok(Self {
            config,
            catalog,
            inspector,
            registry,
            thumbnail_interactor,
            split_interactor,
            concat_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    fn catalog(&self) -> Arc<AssetCatalog> {
        Arc::clone(&self.catalog)
    }

    fn inspector(&self) -> Arc<AssetInspector> {
        Arc::clone(&self.inspector)
    }

    fn registry(&self) -> Arc<ArtifactRegistry> {
        Arc::clone(&self.registry)
    }

    fn thumbnail_interactor(&self) -> Arc<ThumbnailInteractor> {
        Arc::clone(&self.thumbnail_interactor)
    }

    fn split_interactor(&self) -> Arc<SplitInteractor> {
        Arc::clone(&self.split_interactor)
    }

    fn concat_interactor(&self) -> Arc<ConcatInteractor> {
        Arc::clone(&self.concat_interactor)
    }
}
