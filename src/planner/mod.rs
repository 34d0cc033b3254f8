//! Timeline planning: segment partitions and thumbnail sample plans

pub mod partition;
pub mod sampler;

pub use partition::{TimelinePartitioner, DEFAULT_MIN_SEGMENT};
pub use sampler::{CountParam, SamplerLimits, ThumbnailSampler};
