//! Thumbnail sampling: uniform instants across a timeline

use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// Bounds and spacing used by the sampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerLimits {
    pub min_count: usize,
    pub max_count: usize,
    pub default_count: usize,
    /// Distance kept from the end of the stream
    pub epsilon: f64,
}

impl Default for SamplerLimits {
    fn default() -> Self {
        Self {
            min_count: 4,
            max_count: 120,
            default_count: 24,
            epsilon: 0.01,
        }
    }
}

/// Requested thumbnail count as it arrives from a caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountParam {
    Number(f64),
    Text(String),
}

/// Uniform thumbnail sampler
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailSampler {
    limits: SamplerLimits,
}

impl ThumbnailSampler {
    pub fn new(limits: SamplerLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &SamplerLimits {
        &self.limits
    }

    /// Interpret a caller-supplied count. Absent means the configured default;
    /// anything that is not a whole number is rejected rather than defaulted.
    pub fn resolve_count(&self, count: Option<&CountParam>) -> DomainResult<usize> {
        let raw = match count {
            None => return Ok(self.clamp_count(self.limits.default_count as i64)),
            Some(CountParam::Number(n)) => *n,
            Some(CountParam::Text(s)) => s.trim().parse::<f64>().map_err(|_| {
                DomainError::InvalidInput(format!("Thumbnail count is not a number: {:?}", s))
            })?,
        };
        if !raw.is_finite() || raw.fract() != 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Thumbnail count must be a whole number, got {}",
                raw
            )));
        }
        Ok(self.clamp_count(raw as i64))
    }

    /// Clamp a count into `[min_count, max_count]`
    pub fn clamp_count(&self, count: i64) -> usize {
        count.clamp(self.limits.min_count as i64, self.limits.max_count as i64) as usize
    }

    /// Sample `count` (clamped) instants over `[0, duration)`
    pub fn sample(&self, duration: f64, count: usize) -> DomainResult<Vec<f64>> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Duration must be positive, got {}",
                duration
            )));
        }

        let n = self.clamp_count(count.min(i64::MAX as usize) as i64);
        let step = duration / n as f64;
        let last = (duration - self.limits.epsilon).max(0.0);

        Ok((0..n).map(|i| (i as f64 * step).min(last)).collect())
    }
}
