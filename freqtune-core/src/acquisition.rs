//! Boundary with whatever delivers samples: an ADC driver, the audio capture
//! in [`crate::audio`], or the simulator.

use log::warn;

use crate::buffer::SampleBuffer;
use crate::error::AcquisitionError;

/// A producer of unsigned samples at a fixed rate.
pub trait SampleSource {
    /// Nominal rate of the delivered samples, in Hz.
    fn sample_rate(&self) -> u32;

    /// Fills `buf` and returns how many samples were written. May block
    /// until enough samples are available.
    fn fill(&mut self, buf: &mut [u16]) -> Result<usize, AcquisitionError>;
}

/// Takes `len` samples from `source` into a fresh buffer.
///
/// A source that writes fewer than `len` samples produces
/// [`AcquisitionError::ShortRead`]; the analysis never sees partial buffers.
pub fn acquire<S: SampleSource + ?Sized>(
    source: &mut S,
    len: usize,
) -> Result<SampleBuffer, AcquisitionError> {
    let mut buffer = SampleBuffer::zeroed(len, source.sample_rate());
    let filled = source.fill(buffer.samples_mut())?;
    if filled != len {
        warn!("short read: requested {len} samples, got {filled}");
        return Err(AcquisitionError::ShortRead {
            requested: len,
            filled,
        });
    }
    Ok(buffer)
}
