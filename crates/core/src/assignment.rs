//! Sampling rules for the background labeling process.
//!
//! Each assignment round waits a delay drawn uniformly from a [`DelayRange`]
//! before attaching one label, standing in for real labeling latency.

use std::time::Duration;

use rand::Rng;

use crate::error::CoreError;

/// Default lower bound of the simulated labeling delay.
pub const DEFAULT_MIN_DELAY_MS: u64 = 500;

/// Default upper bound of the simulated labeling delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// Inclusive millisecond range the per-round delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, CoreError> {
        if min_ms > max_ms {
            return Err(CoreError::Validation(format!(
                "delay range minimum ({min_ms} ms) exceeds maximum ({max_ms} ms)"
            )));
        }
        Ok(Self { min_ms, max_ms })
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Draw one delay uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_MIN_DELAY_MS,
            max_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
