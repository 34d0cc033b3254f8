//! Batch job runner: bounded, order-preserving, failure-isolating execution

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};

/// Outcome of one planned slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SlotOutcome<T> {
    Done { value: T },
    Failed { error: String },
}

/// One slot of a batch, aligned with the plan index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSlot<T> {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: SlotOutcome<T>,
}

impl<T> BatchSlot<T> {
    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            SlotOutcome::Done { value } => Some(value),
            SlotOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            SlotOutcome::Done { .. } => None,
            SlotOutcome::Failed { error } => Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, SlotOutcome::Failed { .. })
    }
}

/// Failure count over the whole batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.total - self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.failed == 1 { "failure" } else { "failures" };
        write!(f, "{} {} of {}", self.failed, noun, self.total)
    }
}

/// Results of a batch in plan order, one slot per planned item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult<T> {
    pub slots: Vec<BatchSlot<T>>,
}

impl<T> BatchResult<T> {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.slots.len(),
            failed: self.slots.iter().filter(|s| s.is_failed()).count(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Successful values in plan order
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(BatchSlot::value)
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> BatchResult<U> {
        BatchResult {
            slots: self
                .slots
                .into_iter()
                .map(|slot| BatchSlot {
                    index: slot.index,
                    outcome: match slot.outcome {
                        SlotOutcome::Done { value } => SlotOutcome::Done { value: f(value) },
                        SlotOutcome::Failed { error } => SlotOutcome::Failed { error },
                    },
                })
                .collect(),
        }
    }
}

/// Runs independent jobs with at most `max_concurrent` in flight.
///
/// The permit pool is shared by every batch started from the same runner, so
/// the limit bounds external processes across concurrent requests too.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl BatchRunner {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Take one slot of the pool for a job run outside a batch
    pub async fn acquire(&self) -> DomainResult<OwnedSemaphorePermit> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DomainError::JobFailed("worker pool closed".to_string()))
    }

    /// Attempt every item of `plan` with `worker`.
    ///
    /// A failing item is recorded in its own slot and never cancels the
    /// others. Items may finish in any order; slots come back in plan order.
    pub async fn run<I, T, F, Fut>(&self, label: &str, plan: Vec<I>, worker: F) -> BatchResult<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let started = Instant::now();
        let total = plan.len();
        debug!(batch = label, items = total, limit = self.max_concurrent, "Dispatching batch");

        let jobs = plan.into_iter().enumerate().map(|(index, item)| {
            let job = worker(index, item);
            async move {
                let outcome = match self.acquire().await {
                    Ok(_permit) => job.await,
                    Err(e) => Err(e),
                };
                let outcome = match outcome {
                    Ok(value) => SlotOutcome::Done { value },
                    Err(e) => {
                        warn!(batch = label, index, error = %e, "Batch item failed");
                        SlotOutcome::Failed {
                            error: e.detail(),
                        }
                    }
                };
                BatchSlot { index, outcome }
            }
        });

        let result = BatchResult {
            slots: join_all(jobs).await,
        };

        let summary = result.summary();
        info!(
            batch = label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished: {}",
            summary
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_slot() {
        let runner = BatchRunner::new(4);
        let result = runner
            .run("test", vec![10, 20, 30, 40, 50], |index, item| async move {
                if index == 2 {
                    Err(DomainError::ToolFailed {
                        tool: "ffmpeg".to_string(),
                        detail: "exit status 1".to_string(),
                    })
                } else {
                    Ok(item * 2)
                }
            })
            .await;

        assert_eq!(result.len(), 5);
        assert!(result.slots[2].is_failed());
        assert!(result.slots[2].error().unwrap().contains("exit status 1"));
        for (i, slot) in result.slots.iter().enumerate() {
            assert_eq!(slot.index, i);
        }
        assert_eq!(result.successes().copied().collect::<Vec<_>>(), vec![20, 40, 80, 100]);

        let summary = result.summary();
        assert_eq!(summary, BatchSummary { total: 5, failed: 1 });
        assert_eq!(summary.to_string(), "1 failure of 5");
    }

    #[tokio::test]
    async fn test_results_keep_plan_order_when_finishing_out_of_order() {
        let runner = BatchRunner::new(8);
        let result = runner
            .run("order", vec![50u64, 5, 30, 1, 20], |_, delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay)
            })
            .await;

        let values: Vec<u64> = result.successes().copied().collect();
        assert_eq!(values, vec![50, 5, 30, 1, 20]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let runner = BatchRunner::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let result = runner
            .run("bounded", (0..10).collect::<Vec<_>>(), |_, item| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, DomainError>(item)
                }
            })
            .await;

        assert!(result.summary().all_succeeded());
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_held_permit_blocks_batch_items() {
        let runner = BatchRunner::new(1);
        let permit = runner.acquire().await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            runner.run("blocked", vec![1], |_, item| async move { Ok(item) }),
        )
        .await;
        assert!(blocked.is_err());

        drop(permit);
        let result = runner
            .run("free", vec![1], |_, item| async move { Ok(item) })
            .await;
        assert!(result.summary().all_succeeded());
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let runner = BatchRunner::new(4);
        let result = runner
            .run("empty", Vec::<u8>::new(), |_, item| async move { Ok(item) })
            .await;
        assert!(result.is_empty());
        assert_eq!(result.summary().to_string(), "0 failures of 0");
    }

    #[test]
    fn test_slot_serialization_shape() {
        let result = BatchResult {
            slots: vec![
                BatchSlot {
                    index: 0,
                    outcome: SlotOutcome::Done {
                        value: "/thumbs/a/thumb_0.jpg".to_string(),
                    },
                },
                BatchSlot {
                    index: 1,
                    outcome: SlotOutcome::Failed {
                        error: "ffmpeg: boom".to_string(),
                    },
                },
            ],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["slots"][0]["status"], "done");
        assert_eq!(json["slots"][0]["value"], "/thumbs/a/thumb_0.jpg");
        assert_eq!(json["slots"][1]["status"], "failed");
        assert_eq!(json["slots"][1]["index"], 1);
    }
}
