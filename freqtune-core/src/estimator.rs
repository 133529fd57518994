//! # Frequency Estimation Module
//!
//! Estimates the fundamental frequency of a sampled signal by counting rising
//! edges instead of transforming it. The buffer is cut into "above" and
//! "below" excursions with a hysteresis band around the mean, every upward
//! crossing of the band is recorded, and two estimates are derived:
//!
//! - **Classic frequency**: edges counted over the span between the first and
//!   the last edge. Uses every edge in the buffer.
//! - **Mean period**: average spacing of the stored edges, together with the
//!   standard deviation of those spacings as a quality figure.
//!
//! ## Requirements on the input
//! - Signal frequency below a third of the sample rate
//! - At least three periods in the buffer
//! - Enough amplitude to clear the noise floor

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::config::{AnalysisConfig, Smoothing};
use crate::error::AnalysisError;
use crate::filter::SampleFilter;
use crate::statistics::SignalStatistics;

/// Marker for a period or quality that could not be computed.
pub const UNDEFINED: f32 = f32::MAX;

/// Lower and upper segmentation thresholds in sample units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HysteresisBand {
    pub lower: u16,
    pub upper: u16,
}

impl HysteresisBand {
    /// Places the band around the mean at `1 / divisor` of the distance to
    /// each extreme. A threshold that would end up within the noise floor of
    /// its extreme falls back to half a noise floor from the mean, which keeps
    /// lopsided signals from producing a band that is never left.
    pub fn from_statistics(stats: &SignalStatistics, config: &AnalysisConfig) -> Self {
        let mean = stats.mean as i32;
        let min = stats.min as i32;
        let max = stats.max as i32;
        let floor = config.noise_floor as i32;
        let divisor = config.hysteresis_divisor.max(1) as i32;

        let mut lower = mean - (mean - min) / divisor;
        if lower <= min + floor {
            lower = mean - floor / 2;
        }

        let mut upper = mean + (max - mean) / divisor;
        if upper >= max - floor {
            upper = mean + floor / 2;
        }

        Self {
            lower: lower.clamp(0, u16::MAX as i32) as u16,
            upper: upper.clamp(0, u16::MAX as i32) as u16,
        }
    }
}

/// Which side of the band the signal was last seen on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    /// Above the upper threshold, waiting to drop below the lower one.
    High,
    /// Re-armed: the next sample above the upper threshold is an edge.
    Low,
}

/// Rising edges found in one buffer.
///
/// Only the first `capacity` positions are kept; later edges still update
/// the count and the last position.
#[derive(Debug, Clone)]
struct EdgeList {
    positions: Vec<usize>,
    capacity: usize,
    total: u32,
    last: usize,
}

impl EdgeList {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            capacity,
            total: 0,
            last: 0,
        }
    }

    fn record(&mut self, position: usize) {
        if self.positions.len() < self.capacity {
            self.positions.push(position);
        }
        self.total += 1;
        self.last = position;
    }

    fn truncated(&self) -> bool {
        self.total as usize > self.positions.len()
    }
}

/// How much the quality figure can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// At least two periods were stored, so the deviation was measured.
    Measured,
    /// A single period only; quality is reported as 0 but means nothing.
    Low,
}

/// Result of one successful [`FrequencyEstimator::analyze`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyAnalysis {
    /// Periods counted over the whole edge sequence divided by its duration, in Hz.
    pub classic_frequency: f32,
    /// Number of periods behind `classic_frequency` (all edges minus one).
    pub classic_period_count: u32,
    /// Average spacing of the stored edges, in seconds.
    pub mean_period: f32,
    /// Number of periods behind `mean_period` and `quality`.
    pub period_count: u32,
    /// Standard deviation of the stored periods, in seconds.
    pub quality: f32,
    /// More edges were seen than the edge list could store.
    pub truncated: bool,
}

impl FrequencyAnalysis {
    /// Placeholder for "no reading": frequency 0, undefined period and quality.
    pub fn undefined() -> Self {
        Self {
            classic_frequency: 0.0,
            classic_period_count: 0,
            mean_period: UNDEFINED,
            period_count: 0,
            quality: UNDEFINED,
            truncated: false,
        }
    }

    /// Reciprocal of the mean period, in Hz.
    pub fn mean_period_frequency(&self) -> f32 {
        if self.mean_period > 0.0 && self.mean_period < UNDEFINED {
            1.0 / self.mean_period
        } else {
            0.0
        }
    }

    pub fn confidence(&self) -> Confidence {
        if self.period_count >= 2 {
            Confidence::Measured
        } else {
            Confidence::Low
        }
    }

    /// Quality relative to the mean period (0 = perfectly regular).
    pub fn relative_quality(&self) -> f32 {
        self.quality / self.mean_period
    }
}

/// Edge-counting frequency estimator.
#[derive(Debug, Clone, Default)]
pub struct FrequencyEstimator {
    config: AnalysisConfig,
}

impl FrequencyEstimator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Estimates frequency, mean period and quality of `buffer`.
    ///
    /// `stats` must come from [`SignalStatistics::compute`] over the same
    /// buffer with the same smoothing setting.
    ///
    /// # Returns
    /// * `Err(InvalidInput)` - the buffer is empty or its timing is unusable
    /// * `Err(ConstantSignal)` - amplitude span within the noise floor
    /// * `Err(InsufficientEdges)` - fewer than two rising edges
    /// * `Ok(analysis)` - see [`FrequencyAnalysis::confidence`] for single-period results
    pub fn analyze(
        &self,
        buffer: &SampleBuffer,
        stats: &SignalStatistics,
    ) -> Result<FrequencyAnalysis, AnalysisError> {
        buffer.validate()?;

        let span = stats.max.saturating_sub(stats.min);
        if span <= self.config.noise_floor {
            return Err(AnalysisError::ConstantSignal { span });
        }

        let band = HysteresisBand::from_statistics(stats, &self.config);
        trace!(
            "thresholds lower={} upper={} (min={} mean={} max={})",
            band.lower, band.upper, stats.min, stats.mean, stats.max
        );

        let edges = self.segment(buffer.samples(), band);
        let analysis = evaluate(&edges, buffer.sample_interval())?;

        debug!(
            "classic F={:.1} Hz (NC={}) mean period={:.1} us (Fp={:.1}) N={} quality={:.1} us",
            analysis.classic_frequency,
            analysis.classic_period_count,
            analysis.mean_period * 1e6,
            analysis.mean_period_frequency(),
            analysis.period_count,
            analysis.quality * 1e6
        );
        Ok(analysis)
    }

    /// Walks the buffer through the two-state machine and records rising edges.
    fn segment(&self, samples: &[u16], band: HysteresisBand) -> EdgeList {
        let upper = band.upper;
        let lower = band.lower;
        let run_len = self.config.min_tick_spacing.min(samples.len());
        let initial = &samples[..run_len];

        // Start state by strict majority over the initial run. A run that
        // ends above the band has already crossed it, so the walk starts High
        // and the next edge is a real crossing.
        let mut run_filter = SampleFilter::new(self.config.smoothing, samples[0]);
        let mut above = 0;
        let mut ends_above = false;
        for &raw in initial {
            ends_above = run_filter.apply(raw) > upper;
            if ends_above {
                above += 1;
            }
        }
        let mut level = if above > run_len / 2 || ends_above {
            Level::High
        } else {
            Level::Low
        };

        let mut filter = match self.config.smoothing {
            Smoothing::None => SampleFilter::new(Smoothing::None, 0),
            smoothing => SampleFilter::new(smoothing, run_mean(initial)),
        };

        let mut edges = EdgeList::with_capacity(self.config.max_stored_edges.max(2));
        for (i, &raw) in samples.iter().enumerate().skip(run_len) {
            let value = filter.apply(raw);
            match level {
                Level::High => {
                    if value <= lower {
                        level = Level::Low;
                    }
                }
                Level::Low => {
                    if value > upper {
                        level = Level::High;
                        edges.record(i);
                    }
                }
            }
        }
        edges
    }
}

fn run_mean(run: &[u16]) -> u16 {
    if run.is_empty() {
        return 0;
    }
    (run.iter().map(|&s| s as u64).sum::<u64>() / run.len() as u64) as u16
}

/// Turns edge positions into frequency, mean period and quality.
fn evaluate(edges: &EdgeList, interval: f32) -> Result<FrequencyAnalysis, AnalysisError> {
    let stored = &edges.positions;
    if edges.total < 2 || stored.len() < 2 {
        return Err(AnalysisError::InsufficientEdges { edges: edges.total });
    }

    let first = stored[0];
    let classic_period_count = edges.total - 1;
    // Position difference, not a sum of periods, so rounding does not accumulate.
    let classic_frequency = classic_period_count as f32 / (edges.last - first) as f32 / interval;

    let period_count = (stored.len() - 1) as u32;
    let stored_span = stored[stored.len() - 1] - first;
    let mean_period = stored_span as f32 * interval / period_count as f32;

    let quality = if stored.len() >= 3 {
        let sum_sq: f32 = stored
            .windows(2)
            .map(|w| {
                let delta = (w[1] - w[0]) as f32 * interval - mean_period;
                delta * delta
            })
            .sum();
        (sum_sq / (period_count - 1) as f32).sqrt()
    } else {
        0.0
    };

    Ok(FrequencyAnalysis {
        classic_frequency,
        classic_period_count,
        mean_period,
        period_count,
        quality,
        truncated: edges.truncated(),
    })
}
