//! Causal moving-average filter used for optional smoothing.

use crate::config::Smoothing;

/// Fixed-window running mean over the most recent samples.
///
/// The window is pre-filled with a seed value so the first outputs are not
/// pulled towards zero.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: Vec<u16>,
    next: usize,
    sum: u64,
}

impl MovingAverage {
    /// Panics if `window_len` is zero; `AnalysisConfig::validate` rules that out.
    pub fn new(window_len: usize, seed: u16) -> Self {
        assert!(window_len > 0, "moving average window must not be empty");
        Self {
            window: vec![seed; window_len],
            next: 0,
            sum: seed as u64 * window_len as u64,
        }
    }

    /// Feeds one sample and returns the mean of the current window.
    pub fn push(&mut self, sample: u16) -> u16 {
        self.sum -= self.window[self.next] as u64;
        self.sum += sample as u64;
        self.window[self.next] = sample;
        self.next = (self.next + 1) % self.window.len();
        (self.sum / self.window.len() as u64) as u16
    }
}

/// Per-sample smoothing stage built from a [`Smoothing`] choice.
#[derive(Debug, Clone)]
pub(crate) enum SampleFilter {
    Passthrough,
    Average(MovingAverage),
}

impl SampleFilter {
    pub(crate) fn new(smoothing: Smoothing, seed: u16) -> Self {
        match smoothing {
            Smoothing::None => SampleFilter::Passthrough,
            Smoothing::MovingAverage { window } => {
                SampleFilter::Average(MovingAverage::new(window.max(1), seed))
            }
        }
    }

    #[inline]
    pub(crate) fn apply(&mut self, sample: u16) -> u16 {
        match self {
            SampleFilter::Passthrough => sample,
            SampleFilter::Average(avg) => avg.push(sample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_window_is_stable() {
        let mut avg = MovingAverage::new(5, 100);
        assert_eq!(avg.push(100), 100);
        assert_eq!(avg.push(100), 100);
    }

    #[test]
    fn step_response_ramps_over_window() {
        let mut avg = MovingAverage::new(4, 0);
        let out: Vec<u16> = (0..6).map(|_| avg.push(400)).collect();
        assert_eq!(out, vec![100, 200, 300, 400, 400, 400]);
    }

    #[test]
    fn full_scale_samples_do_not_overflow() {
        let mut avg = MovingAverage::new(5, u16::MAX);
        for _ in 0..20 {
            assert_eq!(avg.push(u16::MAX), u16::MAX);
        }
    }

    #[test]
    fn passthrough_leaves_samples_alone() {
        let mut filter = SampleFilter::new(Smoothing::None, 0);
        assert_eq!(filter.apply(1234), 1234);
    }
}
