// Split interactor - Cuts a video into consecutive segments at user markers

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::asset_catalog::AssetCatalog;
use crate::app::job_failure;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::{BatchResult, BatchRunner};
use crate::output::ArtifactRegistry;
use crate::planner::TimelinePartitioner;
use crate::ports::*;
use crate::probe::AssetInspector;

/// Request to split an asset at the given markers (seconds)
#[derive(Debug, Clone, Deserialize)]
pub struct SplitRequest {
    #[serde(alias = "filename")]
    pub asset_id: String,
    #[serde(default, alias = "times")]
    pub markers: Vec<f64>,
}

/// Gapless partition of one asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionPlan {
    pub asset_id: String,
    pub duration: f64,
    pub ranges: Vec<TimeRange>,
}

/// Result of a split run
#[derive(Debug, Clone, Serialize)]
pub struct SplitResponse {
    pub plan: PartitionPlan,
    pub batch: BatchResult<Artifact>,
}

impl SplitResponse {
    /// References of the segments that were produced, in timeline order
    pub fn references(&self) -> Vec<String> {
        self.batch.successes().map(|a| a.reference.clone()).collect()
    }
}

/// Interactor for the split use case
pub struct SplitInteractor {
    catalog: Arc<AssetCatalog>,
    inspector: Arc<AssetInspector>,
    execute_port: Arc<dyn ExecutePort>,
    registry: Arc<ArtifactRegistry>,
    runner: BatchRunner,
    partitioner: TimelinePartitioner,
    fallback_extension: String,
}

impl SplitInteractor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<AssetCatalog>,
        inspector: Arc<AssetInspector>,
        execute_port: Arc<dyn ExecutePort>,
        registry: Arc<ArtifactRegistry>,
        runner: BatchRunner,
        partitioner: TimelinePartitioner,
        fallback_extension: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            inspector,
            execute_port,
            registry,
            runner,
            partitioner,
            fallback_extension: fallback_extension.into(),
        }
    }

    /// Partition and cut
    pub async fn execute(&self, request: SplitRequest) -> DomainResult<SplitResponse> {
        let plan = self
            .create_partition_plan(&request.asset_id, &request.markers)
            .await?;
        let batch = self.run_split_batch(&request.asset_id, &plan.ranges).await?;
        Ok(SplitResponse { plan, batch })
    }

    /// Probe the asset (once) and partition its timeline at `markers`
    pub async fn create_partition_plan(
        &self,
        asset_id: &str,
        markers: &[f64],
    ) -> DomainResult<PartitionPlan> {
        let asset = self.catalog.open(asset_id)?;
        let duration = self.inspector.duration(&asset).await?;
        let ranges = self.partitioner.partition(duration, markers)?;

        Ok(PartitionPlan {
            asset_id: asset.id().to_string(),
            duration,
            ranges,
        })
    }

    /// Cut every range in stream-copy mode. Slot `i` holds `segment_i` or its failure.
    ///
    /// Segments land in the plan's own folder; cutting the same ranges again
    /// reuses them, other ranges never replace them.
    pub async fn run_split_batch(
        &self,
        asset_id: &str,
        ranges: &[TimeRange],
    ) -> DomainResult<BatchResult<Artifact>> {
        if let Some(bad) = ranges
            .iter()
            .find(|r| !(r.start.is_finite() && r.end.is_finite() && r.start >= 0.0 && r.start < r.end))
        {
            return Err(DomainError::InvalidInput(format!("Invalid range: {}", bad)));
        }
        let asset = self.catalog.open(asset_id)?;
        let extension = match asset.extension().trim_start_matches('.') {
            "" => self.fallback_extension.clone(),
            ext => ext.to_string(),
        };
        let recipes: Vec<Recipe> = ranges.iter().map(Recipe::trim).collect();
        let owner = ArtifactRegistry::plan_owner(asset.id(), &recipes)?;

        info!(asset = asset.id(), owner = %owner, segments = ranges.len(), "Splitting asset");
        let plan: Vec<(TimeRange, Recipe)> = ranges.iter().copied().zip(recipes).collect();
        let asset = &asset;
        let owner = owner.as_str();
        let extension = extension.as_str();
        let result = self
            .runner
            .run("split", plan, |index, (range, recipe)| async move {
                self.registry
                    .produce(
                        ArtifactKind::Segment,
                        owner,
                        index,
                        extension,
                        recipe,
                        |output| async move {
                            self.execute_port
                                .trim(asset.path(), &range, &output)
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
