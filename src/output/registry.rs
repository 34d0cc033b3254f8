//! Artifact registry: naming, publication and reference resolution
//!
//! Every derived file lives at `<kind-folder>/<owner>/<stem>_<index>.<ext>`
//! and is addressed publicly as `<kind-prefix>/<owner>/<stem>_<index>.<ext>`.
//! Batch owners are plan folders `<asset>/<plan>`, so a changed plan never
//! reuses a name. The registry is the only place that turns a reference back
//! into a filesystem path, and only for references it issued itself.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::TempPath;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config_initialization::StorageConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{validate_identifier, Artifact, ArtifactKind, Recipe};
use crate::output::writer::{pending_path, publish, sweep_pending, write_atomic};

const MANIFEST_VERSION: u32 = 1;

/// Hex digits of the plan digest kept in folder names
const PLAN_ID_LEN: usize = 12;

/// Identity of an artifact slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub kind: ArtifactKind,
    pub owner: String,
    pub index: usize,
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u32,
    artifacts: Vec<Artifact>,
}

#[derive(Default)]
struct Entries {
    by_key: BTreeMap<ArtifactKey, Artifact>,
    by_reference: HashMap<String, ArtifactKey>,
}

impl Entries {
    fn insert(&mut self, artifact: Artifact) {
        let key = ArtifactKey {
            kind: artifact.kind,
            owner: artifact.owner.clone(),
            index: artifact.index,
        };
        self.remove(&key);
        self.by_reference.insert(artifact.reference.clone(), key.clone());
        self.by_key.insert(key, artifact);
    }

    fn remove(&mut self, key: &ArtifactKey) -> Option<Artifact> {
        let artifact = self.by_key.remove(key)?;
        self.by_reference.remove(&artifact.reference);
        Some(artifact)
    }

    fn snapshot(&self) -> Vec<Artifact> {
        self.by_key.values().cloned().collect()
    }
}

/// A slot reserved for a job: write to `pending`, then [`ArtifactRegistry::commit`]
#[derive(Debug)]
pub struct PendingArtifact {
    key: ArtifactKey,
    recipe: Recipe,
    target: PathBuf,
    reference: String,
    pending: TempPath,
}

impl PendingArtifact {
    /// Where the job must write its output
    pub fn path(&self) -> &Path {
        &self.pending
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Outcome of [`ArtifactRegistry::register`]
#[derive(Debug)]
pub enum Registration {
    /// The slot already holds an artifact built from the same recipe
    Existing(Artifact),
    /// The slot is free; produce the file and commit it
    Pending(PendingArtifact),
}

/// Registry of derived files, persisted to a JSON manifest
pub struct ArtifactRegistry {
    storage: StorageConfig,
    entries: Mutex<Entries>,
}

impl ArtifactRegistry {
    /// Open the registry rooted at `storage`.
    ///
    /// Creates the managed folders, removes pending files left by earlier
    /// runs and reloads the manifest, dropping entries whose file is gone.
    pub async fn open(storage: &StorageConfig) -> DomainResult<Self> {
        storage.ensure_directories()?;
        for kind in ArtifactKind::ALL {
            sweep_pending(&storage.kind_path(kind));
        }

        let mut entries = Entries::default();
        let manifest_path = storage.manifest_path();
        let mut dropped = 0;
        match tokio::fs::read(&manifest_path).await {
            Ok(raw) => {
                let manifest: Manifest = serde_json::from_slice(&raw).map_err(|e| {
                    DomainError::FsFail(format!(
                        "Unreadable manifest {}: {}",
                        manifest_path.display(),
                        e
                    ))
                })?;
                for artifact in manifest.artifacts {
                    if artifact.path.is_file() {
                        entries.insert(artifact);
                    } else {
                        debug!(reference = %artifact.reference, "Dropping manifest entry without file");
                        dropped += 1;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let registry = Self {
            storage: storage.clone(),
            entries: Mutex::new(entries),
        };
        if dropped > 0 {
            let entries = registry.entries.lock().await;
            registry.persist(&entries).await?;
            info!("Dropped {} manifest entries whose files are missing", dropped);
        }
        Ok(registry)
    }

    /// Public reference for a slot
    pub fn reference_for(kind: ArtifactKind, owner: &str, index: usize, extension: &str) -> String {
        format!(
            "{}/{}/{}",
            kind.public_prefix(),
            owner,
            file_name(kind, index, extension)
        )
    }

    /// Owner folder for one plan of `asset_id`.
    ///
    /// The plan part is a UUID v5 digest of `recipes`: the same plan maps to
    /// the same folder, a different plan to a new one.
    pub fn plan_owner(asset_id: &str, recipes: &[Recipe]) -> DomainResult<String> {
        validate_identifier(asset_id)?;
        let encoded = serde_json::to_vec(recipes)
            .map_err(|e| DomainError::InvalidInput(format!("Unencodable plan: {}", e)))?;
        let digest = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, &encoded)
            .simple()
            .to_string();
        Ok(format!("{}/{}", asset_id, &digest[..PLAN_ID_LEN]))
    }

    /// Public folder of `owner` for `kind`
    pub fn folder_reference(kind: ArtifactKind, owner: &str) -> String {
        format!("{}/{}", kind.public_prefix(), owner)
    }

    /// Filesystem folder holding every artifact of `owner` for `kind`
    pub fn owner_dir(&self, kind: ArtifactKind, owner: &str) -> PathBuf {
        self.storage.kind_path(kind).join(owner)
    }

    /// Claim the slot `(kind, owner, index)` for content described by `recipe`.
    ///
    /// Returns the existing artifact when the slot already holds the same
    /// recipe, and `NamingCollision` when it holds a different one.
    pub async fn register(
        &self,
        kind: ArtifactKind,
        owner: &str,
        index: usize,
        extension: &str,
        recipe: Recipe,
    ) -> DomainResult<Registration> {
        validate_owner(owner)?;
        if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidInput(format!(
                "Invalid extension: {:?}",
                extension
            )));
        }

        let key = ArtifactKey {
            kind,
            owner: owner.to_string(),
            index,
        };
        let reference = Self::reference_for(kind, owner, index, extension);

        {
            let entries = self.entries.lock().await;
            if let Some(existing) = entries.by_key.get(&key) {
                check_same(existing, &reference, &recipe)?;
                debug!(reference = %existing.reference, "Reusing registered artifact");
                return Ok(Registration::Existing(existing.clone()));
            }
        }

        let dir = self.owner_dir(kind, owner);
        let target = dir.join(file_name(kind, index, extension));
        let label = format!("{}_{}", kind.stem(), index);
        let pending = pending_path(&dir, &label, extension)?;

        Ok(Registration::Pending(PendingArtifact {
            key,
            recipe,
            target,
            reference,
            pending,
        }))
    }

    /// Publish a finished pending file and record it.
    ///
    /// The rename and the manifest update happen under the registry lock. If
    /// the manifest cannot be written the entry and the published file are
    /// removed again.
    pub async fn commit(&self, pending: PendingArtifact) -> DomainResult<Artifact> {
        let mut entries = self.entries.lock().await;

        if let Some(existing) = entries.by_key.get(&pending.key) {
            // a concurrent job filled the slot first
            check_same(existing, &pending.reference, &pending.recipe)?;
            return Ok(existing.clone());
        }

        let PendingArtifact {
            key,
            recipe,
            target,
            reference,
            pending,
        } = pending;
        let path = publish(pending, &target)?;
        let artifact = Artifact {
            kind: key.kind,
            owner: key.owner.clone(),
            index: key.index,
            path,
            reference,
            recipe,
            created_at: Utc::now(),
        };
        entries.insert(artifact.clone());
        if let Err(e) = self.persist(&entries).await {
            entries.remove(&key);
            if let Err(remove) = tokio::fs::remove_file(&artifact.path).await {
                warn!(reference = %artifact.reference, error = %remove, "Failed to remove unrecorded artifact");
            }
            return Err(e);
        }

        debug!(reference = %artifact.reference, "Registered artifact");
        Ok(artifact)
    }

    /// Register, run `encode` against the pending file if needed, then commit.
    ///
    /// Nothing is recorded when `encode` fails; its partial file is removed.
    pub async fn produce<F, Fut>(
        &self,
        kind: ArtifactKind,
        owner: &str,
        index: usize,
        extension: &str,
        recipe: Recipe,
        encode: F,
    ) -> DomainResult<Artifact>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = DomainResult<PathBuf>>,
    {
        match self.register(kind, owner, index, extension, recipe).await? {
            Registration::Existing(artifact) => Ok(artifact),
            Registration::Pending(pending) => {
                encode(pending.path().to_path_buf()).await?;
                self.commit(pending).await
            }
        }
    }

    /// Translate a public reference into its file. Unknown references are `NotFound`.
    pub async fn resolve(&self, reference: &str) -> DomainResult<PathBuf> {
        let artifact = self
            .lookup(reference)
            .await
            .ok_or_else(|| DomainError::NotFound(format!("Unknown reference: {}", reference)))?;
        if !artifact.path.is_file() {
            return Err(DomainError::NotFound(format!(
                "File for {} is gone",
                reference
            )));
        }
        Ok(artifact.path)
    }

    pub async fn lookup(&self, reference: &str) -> Option<Artifact> {
        let entries = self.entries.lock().await;
        entries
            .by_reference
            .get(reference)
            .and_then(|key| entries.by_key.get(key))
            .cloned()
    }

    /// Every registered artifact, ordered by kind, owner and index
    pub async fn entries(&self) -> Vec<Artifact> {
        self.entries.lock().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.by_key.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn persist(&self, entries: &Entries) -> DomainResult<()> {
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            artifacts: entries.snapshot(),
        };
        let raw = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| DomainError::FsFail(format!("Failed to encode manifest: {}", e)))?;
        write_atomic(&self.storage.manifest_path(), raw).await
    }
}

fn file_name(kind: ArtifactKind, index: usize, extension: &str) -> String {
    if extension.is_empty() {
        format!("{}_{}", kind.stem(), index)
    } else {
        format!("{}_{}.{}", kind.stem(), index, extension)
    }
}

/// An owner is an asset id, optionally followed by one plan folder
fn validate_owner(owner: &str) -> DomainResult<()> {
    let parts: Vec<&str> = owner.split('/').collect();
    if parts.len() > 2 {
        return Err(DomainError::InvalidInput(format!("Invalid owner: {:?}", owner)));
    }
    parts.into_iter().try_for_each(validate_identifier)
}

fn check_same(existing: &Artifact, reference: &str, recipe: &Recipe) -> DomainResult<()> {
    if existing.recipe == *recipe && existing.reference == reference {
        Ok(())
    } else {
        Err(DomainError::NamingCollision(format!(
            "{} already holds different content",
            existing.reference
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_initialization::config_rooted_at;
    use crate::domain::model::TimeRange;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> ArtifactRegistry {
        ArtifactRegistry::open(&config_rooted_at(dir.path()).storage)
            .await
            .unwrap()
    }

    async fn fill(registry: &ArtifactRegistry, index: usize, recipe: Recipe) -> Artifact {
        registry
            .produce(ArtifactKind::Segment, "clip.mp4", index, "mp4", recipe, |path| async move {
                tokio::fs::write(&path, format!("segment {}", index)).await?;
                Ok::<_, DomainError>(path)
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_reference_layout() {
        assert_eq!(
            ArtifactRegistry::reference_for(ArtifactKind::Thumbnail, "a.mp4", 7, "jpg"),
            "/thumbs/a.mp4/thumb_7.jpg"
        );
        assert_eq!(
            ArtifactRegistry::reference_for(ArtifactKind::Output, "x1", 0, "mp4"),
            "/outputs/x1/output_0.mp4"
        );
    }

    #[tokio::test]
    async fn test_commit_publishes_and_resolves() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;

        let artifact = fill(&registry, 0, Recipe::trim(&TimeRange::new(0.0, 3.0))).await;
        assert_eq!(artifact.reference, "/segments/clip.mp4/segment_0.mp4");
        assert_eq!(
            artifact.path,
            dir.path().join("segments").join("clip.mp4").join("segment_0.mp4")
        );
        assert_eq!(registry.resolve(&artifact.reference).await.unwrap(), artifact.path);
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), "segment 0");
    }

    #[tokio::test]
    async fn test_same_recipe_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;
        let recipe = Recipe::trim(&TimeRange::new(3.0, 7.0));

        let first = fill(&registry, 1, recipe.clone()).await;
        match registry
            .register(ArtifactKind::Segment, "clip.mp4", 1, "mp4", recipe)
            .await
            .unwrap()
        {
            Registration::Existing(again) => assert_eq!(again, first),
            Registration::Pending(_) => panic!("slot should already be filled"),
        }
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_different_recipe_collides() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;
        fill(&registry, 1, Recipe::trim(&TimeRange::new(3.0, 7.0))).await;

        let result = registry
            .register(
                ArtifactKind::Segment,
                "clip.mp4",
                1,
                "mp4",
                Recipe::trim(&TimeRange::new(2.0, 7.0)),
            )
            .await;
        assert!(matches!(result, Err(DomainError::NamingCollision(_))));
    }

    #[tokio::test]
    async fn test_racing_commits_keep_first_writer() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;

        let slot = |start: f64| {
            registry.register(
                ArtifactKind::Segment,
                "clip.mp4",
                0,
                "mp4",
                Recipe::trim(&TimeRange::new(start, 5.0)),
            )
        };
        let (Registration::Pending(a), Registration::Pending(b)) =
            (slot(0.0).await.unwrap(), slot(1.0).await.unwrap())
        else {
            panic!("both reservations should be pending");
        };
        std::fs::write(a.path(), "a").unwrap();
        std::fs::write(b.path(), "b").unwrap();

        let winner = registry.commit(a).await.unwrap();
        let loser_path = b.path().to_path_buf();
        assert!(matches!(
            registry.commit(b).await,
            Err(DomainError::NamingCollision(_))
        ));
        assert!(!loser_path.exists());
        assert_eq!(std::fs::read_to_string(&winner.path).unwrap(), "a");
    }

    #[tokio::test]
    async fn test_failed_production_registers_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;

        let result = registry
            .produce(
                ArtifactKind::Thumbnail,
                "clip.mp4",
                0,
                "jpg",
                Recipe::frame(0.0, 320),
                |_| async { Err(DomainError::JobFailed("boom".to_string())) },
            )
            .await;
        assert!(result.is_err());
        assert!(registry.is_empty().await);

        let owner_dir = registry.owner_dir(ArtifactKind::Thumbnail, "clip.mp4");
        assert_eq!(std::fs::read_dir(owner_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_forged_references_are_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;
        fill(&registry, 0, Recipe::trim(&TimeRange::new(0.0, 1.0))).await;

        for reference in [
            "/segments/clip.mp4/segment_9.mp4",
            "/segments/clip.mp4/../../manifest.json",
            "/uploads/clip.mp4",
            "segments/clip.mp4/segment_0.mp4",
        ] {
            assert!(matches!(
                registry.resolve(reference).await,
                Err(DomainError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_owner_is_asset_with_optional_plan_folder() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;
        for owner in ["../x", "a/../b", "a/b/c", "a/", "/a", "a/.hidden"] {
            let result = registry
                .register(ArtifactKind::Segment, owner, 0, "mp4", Recipe::frame(0.0, 1))
                .await;
            assert!(matches!(result, Err(DomainError::InvalidInput(_))), "{}", owner);
        }
        let nested = registry
            .produce(ArtifactKind::Segment, "clip.mp4/0123abcd", 0, "mp4", Recipe::frame(0.0, 1), |path| async move {
                tokio::fs::write(&path, "x").await?;
                Ok::<_, DomainError>(path)
            })
            .await
            .unwrap();
        assert_eq!(nested.reference, "/segments/clip.mp4/0123abcd/segment_0.mp4");
        assert_eq!(
            nested.path,
            dir.path().join("segments").join("clip.mp4").join("0123abcd").join("segment_0.mp4")
        );
    }

    #[test]
    fn test_plan_owner_follows_recipes() {
        let plan = |ends: &[f64]| {
            let recipes: Vec<Recipe> = ends
                .windows(2)
                .map(|w| Recipe::trim(&TimeRange::new(w[0], w[1])))
                .collect();
            ArtifactRegistry::plan_owner("clip.mp4", &recipes).unwrap()
        };
        let first = plan(&[0.0, 5.0, 10.0]);
        assert!(first.starts_with("clip.mp4/"));
        assert_eq!(first.len(), "clip.mp4/".len() + PLAN_ID_LEN);
        assert_eq!(first, plan(&[0.0, 5.0, 10.0]));
        assert_ne!(first, plan(&[0.0, 4.0, 10.0]));
        assert!(ArtifactRegistry::plan_owner("../clip.mp4", &[]).is_err());
    }

    #[tokio::test]
    async fn test_unwritable_manifest_rolls_back_commit() {
        let dir = TempDir::new().unwrap();
        let registry = open(&dir).await;
        std::fs::create_dir(dir.path().join("manifest.json")).unwrap();

        let result = registry
            .produce(
                ArtifactKind::Output,
                "run1",
                0,
                "mp4",
                Recipe::Concat {
                    inputs: vec!["/segments/a/segment_0.mp4".to_string()],
                },
                |path| async move {
                    tokio::fs::write(&path, "joined").await?;
                    Ok::<_, DomainError>(path)
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::FsFail(_))));
        assert!(registry.is_empty().await);
        assert!(matches!(
            registry.resolve("/outputs/run1/output_0.mp4").await,
            Err(DomainError::NotFound(_))
        ));
        let leftovers = walkdir::WalkDir::new(dir.path().join("outputs"))
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_manifest_reload_drops_missing_files() {
        let dir = TempDir::new().unwrap();
        let (kept, lost) = {
            let registry = open(&dir).await;
            (
                fill(&registry, 0, Recipe::trim(&TimeRange::new(0.0, 2.0))).await,
                fill(&registry, 1, Recipe::trim(&TimeRange::new(2.0, 4.0))).await,
            )
        };
        std::fs::remove_file(&lost.path).unwrap();

        let reopened = open(&dir).await;
        assert_eq!(reopened.entries().await, vec![kept.clone()]);
        assert_eq!(reopened.resolve(&kept.reference).await.unwrap(), kept.path);
    }

    #[tokio::test]
    async fn test_open_sweeps_stale_pending_files() {
        let dir = TempDir::new().unwrap();
        let owner = dir.path().join("thumbnails").join("clip.mp4");
        std::fs::create_dir_all(&owner).unwrap();
        let stale = owner.join(".pending-thumb_0-abc123.jpg");
        std::fs::write(&stale, "partial").unwrap();

        let registry = open(&dir).await;
        assert!(!stale.exists());
        assert!(registry.is_empty().await);
    }
}
