//! Uniformly sampled ADC readings plus the timing needed to interpret them.

use crate::error::InvalidInput;

/// A block of unsigned samples (8 to 16 bit) taken at a fixed rate.
///
/// The buffer is filled once by a [`SampleSource`](crate::acquisition::SampleSource)
/// or the simulator; the analysis stages only ever borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<u16>,
    sample_rate: u32,
    sample_interval: f32,
}

impl SampleBuffer {
    /// Wraps `samples` taken at `sample_rate` Hz. The sample interval is
    /// derived as `1 / sample_rate` (0 for a zero rate, which `validate` rejects).
    pub fn new(samples: Vec<u16>, sample_rate: u32) -> Self {
        let sample_interval = if sample_rate == 0 {
            0.0
        } else {
            1.0 / sample_rate as f32
        };
        Self {
            samples,
            sample_rate,
            sample_interval,
        }
    }

    /// A zeroed buffer of `len` samples, ready to be filled.
    pub fn zeroed(len: usize, sample_rate: u32) -> Self {
        Self::new(vec![0; len], sample_rate)
    }

    /// Overrides the derived interval, for sources whose real clock is
    /// measured separately from the nominal rate.
    pub fn with_sample_interval(mut self, sample_interval: f32) -> Self {
        self.sample_interval = sample_interval;
        self
    }

    pub fn samples(&self) -> &[u16] {
        &self.samples
    }

    /// Mutable access for whoever fills the buffer. The length stays fixed.
    pub fn samples_mut(&mut self) -> &mut [u16] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds between two consecutive samples.
    pub fn sample_interval(&self) -> f32 {
        self.sample_interval
    }

    /// Checks the invariants every analysis stage relies on.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.samples.is_empty() {
            return Err(InvalidInput::EmptyBuffer);
        }
        if self.sample_rate == 0 {
            return Err(InvalidInput::ZeroSampleRate);
        }
        if self.sample_interval.is_nan() || self.sample_interval <= f32::MIN_POSITIVE {
            return Err(InvalidInput::NonPositiveInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_follows_rate() {
        let buffer = SampleBuffer::zeroed(10, 30_000);
        assert_eq!(buffer.len(), 10);
        assert!((buffer.sample_interval() - 1.0 / 30_000.0).abs() < 1e-12);
        assert!(buffer.validate().is_ok());
    }

    #[test]
    fn validation_reports_each_defect() {
        assert_eq!(
            SampleBuffer::new(vec![], 30_000).validate(),
            Err(InvalidInput::EmptyBuffer)
        );
        assert_eq!(
            SampleBuffer::new(vec![1, 2, 3], 0).validate(),
            Err(InvalidInput::ZeroSampleRate)
        );
        assert_eq!(
            SampleBuffer::new(vec![1, 2, 3], 30_000)
                .with_sample_interval(0.0)
                .validate(),
            Err(InvalidInput::NonPositiveInterval)
        );
        assert_eq!(
            SampleBuffer::new(vec![1, 2, 3], 30_000)
                .with_sample_interval(-1.0)
                .validate(),
            Err(InvalidInput::NonPositiveInterval)
        );
    }
}
