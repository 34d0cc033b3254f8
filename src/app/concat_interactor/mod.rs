// Concat interactor - Splices registered segments into one output file

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine::BatchRunner;
use crate::output::ArtifactRegistry;
use crate::ports::*;

/// Request to splice artifacts in the given order
#[derive(Debug, Clone, Deserialize)]
pub struct ConcatRequest {
    #[serde(alias = "files")]
    pub references: Vec<String>,
}

/// Progress of one assembly. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyState {
    Validating,
    Resolving,
    Encoding,
    Done,
    Failed,
}

impl AssemblyState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssemblyState::Done | AssemblyState::Failed)
    }

    /// Whether `next` may follow this state
    pub fn can_advance_to(&self, next: AssemblyState) -> bool {
        use AssemblyState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Validating, Resolving) | (Resolving, Encoding) | (Encoding, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssemblyState::Validating => "validating",
            AssemblyState::Resolving => "resolving",
            AssemblyState::Encoding => "encoding",
            AssemblyState::Done => "done",
            AssemblyState::Failed => "failed",
        };
        f.write_str(name)
    }
}

struct Assembly {
    id: String,
    state: AssemblyState,
}

impl Assembly {
    fn advance(&mut self, next: AssemblyState) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {}", self.state, next);
        debug!(assembly = %self.id, from = %self.state, to = %next, "Assembly state");
        self.state = next;
    }

    fn fail(&mut self, error: DomainError) -> DomainError {
        warn!(assembly = %self.id, stage = %self.state, error = %error, "Assembly failed");
        self.advance(AssemblyState::Failed);
        error
    }
}

/// Interactor for the concatenation use case
pub struct ConcatInteractor {
    execute_port: Arc<dyn ExecutePort>,
    registry: Arc<ArtifactRegistry>,
    runner: BatchRunner,
    output_extension: String,
}

impl ConcatInteractor {
    pub fn new(
        execute_port: Arc<dyn ExecutePort>,
        registry: Arc<ArtifactRegistry>,
        runner: BatchRunner,
        output_extension: impl Into<String>,
    ) -> Self {
        Self {
            execute_port,
            registry,
            runner,
            output_extension: output_extension.into(),
        }
    }

    pub async fn execute(&self, request: ConcatRequest) -> DomainResult<Artifact> {
        self.assemble_output(&request.references).await
    }

    /// Splice `references` in order into a new output.
    ///
    /// Every reference is resolved before the tool runs; any failure leaves
    /// no output file and no registry entry. The encode takes a slot of the
    /// shared job pool.
    pub async fn assemble_output(&self, references: &[String]) -> DomainResult<Artifact> {
        let started = Instant::now();
        let mut assembly = Assembly {
            id: uuid::Uuid::new_v4().simple().to_string(),
            state: AssemblyState::Validating,
        };

        if let Err(e) = validate(references) {
            return Err(assembly.fail(e));
        }

        assembly.advance(AssemblyState::Resolving);
        let inputs = match self.resolve_all(references).await {
            Ok(inputs) => inputs,
            Err(e) => return Err(assembly.fail(e)),
        };

        assembly.advance(AssemblyState::Encoding);
        let _permit = match self.runner.acquire().await {
            Ok(permit) => permit,
            Err(e) => return Err(assembly.fail(e)),
        };
        let recipe = Recipe::Concat {
            inputs: references.to_vec(),
        };
        let inputs = &inputs;
        let produced = self
            .registry
            .produce(
                ArtifactKind::Output,
                &assembly.id,
                0,
                &self.output_extension,
                recipe,
                |output| async move {
                    self.execute_port
                        .concat(inputs, &output)
                        .await
                        .map_err(|e| DomainError::AssembleFailed(e.detail()))
                },
            )
            .await;

        match produced {
            Ok(artifact) => {
                assembly.advance(AssemblyState::Done);
                info!(
                    output = %artifact.reference,
                    inputs = references.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Assembled output"
                );
                Ok(artifact)
            }
            Err(e) => Err(assembly.fail(e)),
        }
    }

    async fn resolve_all(&self, references: &[String]) -> DomainResult<Vec<PathBuf>> {
        let mut inputs = Vec::with_capacity(references.len());
        for reference in references {
            let artifact = self.registry.lookup(reference).await.ok_or_else(|| {
                DomainError::NotFound(format!("Unknown reference: {}", reference))
            })?;
            if artifact.kind == ArtifactKind::Thumbnail {
                return Err(DomainError::InvalidInput(format!(
                    "{} is a thumbnail, not a video",
                    reference
                )));
            }
            inputs.push(self.registry.resolve(reference).await?);
        }
        Ok(inputs)
    }
}

fn validate(references: &[String]) -> DomainResult<()> {
    if references.is_empty() {
        return Err(DomainError::InvalidInput(
            "Nothing to concatenate".to_string(),
        ));
    }
    if references.iter().any(|r| r.trim().is_empty()) {
        return Err(DomainError::InvalidInput("Empty reference".to_string()));
    }
    Ok(())
}
