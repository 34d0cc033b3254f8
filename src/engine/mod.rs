//! Job execution engine

pub mod batch;

pub use batch::{BatchResult, BatchRunner, BatchSlot, BatchSummary, SlotOutcome};
