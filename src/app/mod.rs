// Application layer - Use case interactors

pub mod asset_catalog;
pub mod concat_interactor;
pub mod container;
pub mod split_interactor;
pub mod thumbnail_interactor;

// Re-export interactors
pub use asset_catalog::AssetCatalog;
pub use concat_interactor::{AssemblyState, ConcatInteractor, ConcatRequest};
pub use container::{AppContainer, DefaultAppContainer};
pub use split_interactor::{PartitionPlan, SplitInteractor, SplitRequest, SplitResponse};
pub use thumbnail_interactor::{SamplePlan, ThumbnailInteractor, ThumbnailRequest, ThumbnailResponse};

use crate::domain::errors::DomainError;

/// Classify a tool failure inside a batch as a failed item
pub(crate) fn job_failure(error: DomainError) -> DomainError {
    match error {
        DomainError::ToolFailed { .. } => DomainError::JobFailed(error.detail()),
        other => other,
    }
}
