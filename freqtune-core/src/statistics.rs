//! # Signal Statistics
//!
//! Min, max and mean of a sample buffer. The frequency estimator derives its
//! hysteresis thresholds from these, so they are computed once per buffer,
//! optionally after smoothing.

use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::config::Smoothing;
use crate::error::{AnalysisError, InvalidInput};
use crate::filter::SampleFilter;

/// Aggregate amplitude figures of one buffer, in sample units.
///
/// `min <= mean <= max` always holds: the mean is an integer division of the
/// exact sum of the same values that produced `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStatistics {
    pub min: u16,
    pub max: u16,
    pub mean: u16,
}

impl SignalStatistics {
    /// Scans `buffer` once. With smoothing enabled every sample passes the
    /// moving average (seeded with the first sample) before it is counted.
    pub fn compute(buffer: &SampleBuffer, smoothing: Smoothing) -> Result<Self, AnalysisError> {
        let samples = buffer.samples();
        let first = *samples.first().ok_or(InvalidInput::EmptyBuffer)?;

        let mut filter = SampleFilter::new(smoothing, first);
        let mut min = u16::MAX;
        let mut max = u16::MIN;
        // u64 holds any realistic buffer of 16 bit samples without overflow.
        let mut sum: u64 = 0;

        for &raw in samples {
            let value = filter.apply(raw);
            min = min.min(value);
            max = max.max(value);
            sum += value as u64;
        }

        let mean = (sum / samples.len() as u64) as u16;
        Ok(Self { min, max, mean })
    }

    /// Peak-to-peak amplitude.
    pub fn span(&self) -> u16 {
        self.max.saturating_sub(self.min)
    }
}
