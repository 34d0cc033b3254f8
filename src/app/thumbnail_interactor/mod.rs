// Thumbnail interactor - Samples a video and grabs one frame per instant

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::asset_catalog::AssetCatalog;
use crate::app::job_failure;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{BatchResult, BatchRunner};
use crate::output::ArtifactRegistry;
use crate::planner::{CountParam, ThumbnailSampler};
use crate::ports::*;
use crate::probe::AssetInspector;

const THUMBNAIL_EXTENSION: &str = "jpg";

/// Request for a thumbnail strip
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailRequest {
    #[serde(alias = "filename")]
    pub asset_id: String,
    #[serde(default)]
    pub count: Option<CountParam>,
}

/// Ordered sample instants for one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplePlan {
    pub asset_id: String,
    pub duration: f64,
    pub instants: Vec<f64>,
}

/// Result of a thumbnail run
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailResponse {
    pub plan: SamplePlan,
    /// Public folder holding the asset's thumbnails
    pub folder: String,
    pub batch: BatchResult<Artifact>,
}

impl ThumbnailResponse {
    /// References of the thumbnails that were produced, in plan order
    pub fn references(&self) -> Vec<String> {
        self.batch.successes().map(|a| a.reference.clone()).collect()
    }
}

/// Interactor for the thumbnail use case
pub struct ThumbnailInteractor {
    catalog: Arc<AssetCatalog>,
    inspector: Arc<AssetInspector>,
    execute_port: Arc<dyn ExecutePort>,
    registry: Arc<ArtifactRegistry>,
    runner: BatchRunner,
    sampler: ThumbnailSampler,
    max_width: u32,
}

impl ThumbnailInteractor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<AssetCatalog>,
        inspector: Arc<AssetInspector>,
        execute_port: Arc<dyn ExecutePort>,
        registry: Arc<ArtifactRegistry>,
        runner: BatchRunner,
        sampler: ThumbnailSampler,
        max_width: u32,
    ) -> Self {
        Self {
            catalog,
            inspector,
            execute_port,
            registry,
            runner,
            sampler,
            max_width,
        }
    }

    /// Plan and run a thumbnail strip
    pub async fn execute(&self, request: ThumbnailRequest) -> DomainResult<ThumbnailResponse> {
        let plan = self
            .create_sample_plan(&request.asset_id, request.count.as_ref())
            .await?;
        let batch = self
            .run_thumbnail_batch(&request.asset_id, &plan.instants)
            .await?;
        let owner = ArtifactRegistry::plan_owner(&plan.asset_id, &self.recipes(&plan.instants))?;
        Ok(ThumbnailResponse {
            folder: ArtifactRegistry::folder_reference(ArtifactKind::Thumbnail, &owner),
            plan,
            batch,
        })
    }

    /// Probe the asset (once) and spread `count` instants across it
    pub async fn create_sample_plan(
        &self,
        asset_id: &str,
        count: Option<&CountParam>,
    ) -> DomainResult<SamplePlan> {
        let count = self.sampler.resolve_count(count)?;
        let asset = self.catalog.open(asset_id)?;
        let duration = self.inspector.duration(&asset).await?;
        let instants = self.sampler.sample(duration, count)?;

        Ok(SamplePlan {
            asset_id: asset.id().to_string(),
            duration,
            instants,
        })
    }

    fn recipes(&self, instants: &[f64]) -> Vec<Recipe> {
        instants
            .iter()
            .map(|&at| Recipe::frame(at, self.max_width))
            .collect()
    }

    /// Grab one frame per instant into the plan's folder. Slot `i` holds
    /// `thumb_i` or its failure.
    pub async fn run_thumbnail_batch(
        &self,
        asset_id: &str,
        instants: &[f64],
    ) -> DomainResult<BatchResult<Artifact>> {
        if let Some(bad) = instants.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(DomainError::InvalidInput(format!(
                "Sample instant out of range: {}",
                bad
            )));
        }
        let asset = self.catalog.open(asset_id)?;
        let recipes = self.recipes(instants);
        let owner = ArtifactRegistry::plan_owner(asset.id(), &recipes)?;

        info!(asset = asset.id(), owner = %owner, count = instants.len(), "Extracting thumbnails");
        let plan: Vec<(f64, Recipe)> = instants.iter().copied().zip(recipes).collect();
        let asset = &asset;
        let owner = owner.as_str();
        let result = self
            .runner
            .run("thumbnails", plan, |index, (at, recipe)| async move {
                self.registry
                    .produce(
                        ArtifactKind::Thumbnail,
                        owner,
                        index,
                        THUMBNAIL_EXTENSION,
                        recipe,
                        |output| async move {
                            self.execute_port
                                .extract_frame(asset.path(), at, &output, self.max_width)
                                .await
                                .map_err(job_failure)
                        },
                    )
                    .await
            })
            .await;
        Ok(result)
    }
}
