//! Asset inspection on top of the probe port

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::ProbePort;

/// Probes assets and caches their duration
pub struct AssetInspector {
    probe_port: Arc<dyn ProbePort>,
}

impl AssetInspector {
    pub fn new(probe_port: Arc<dyn ProbePort>) -> Self {
        Self { probe_port }
    }

    /// Full probe of a file, never cached
    pub async fn inspect(&self, path: &Path) -> DomainResult<MediaInfo> {
        self.probe_port.probe_media(path).await
    }

    /// Duration of `asset`, probed on first use and cached on the asset.
    ///
    /// Concurrent callers share one probe; a failed probe is not cached.
    pub async fn duration(&self, asset: &SourceAsset) -> DomainResult<f64> {
        asset
            .duration_cell()
            .get_or_try_init(|| async {
                let started = Instant::now();
                let info = self.probe_port.probe_media(asset.path()).await?;
                info!(
                    asset = asset.id(),
                    duration = info.duration,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Probed asset"
                );
                Ok::<f64, DomainError>(info.duration)
            })
            .await
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockMediaTool, ToolCall};

    #[tokio::test]
    async fn test_duration_is_probed_once() {
        let tool = Arc::new(MockMediaTool::new(42.5));
        let inspector = AssetInspector::new(tool.clone());
        let asset = SourceAsset::new("a.mp4", "/uploads/a.mp4");

        assert_eq!(inspector.duration(&asset).await.unwrap(), 42.5);
        assert_eq!(inspector.duration(&asset).await.unwrap(), 42.5);
        assert_eq!(asset.cached_duration(), Some(42.5));
        assert_eq!(
            tool.calls(),
            vec![ToolCall::Probe("/uploads/a.mp4".into())]
        );
    }

    #[tokio::test]
    async fn test_failed_probe_is_reported_and_not_cached() {
        let inspector = AssetInspector::new(Arc::new(MockMediaTool::unreadable()));
        let asset = SourceAsset::new("a.mp4", "/uploads/a.mp4");

        assert!(matches!(
            inspector.duration(&asset).await,
            Err(DomainError::ProbeFailed(_))
        ));
        assert_eq!(asset.cached_duration(), None);
    }
}
