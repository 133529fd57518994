//! # Signal Simulator
//!
//! Generates synthetic ADC readings so the analysis chain can be exercised
//! without hardware. Amplitude and offset are drawn at random for every
//! buffer (within fixed bounds of the ADC range) and optional uniform noise is
//! added per sample. A seeded RNG keeps every run reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use crate::acquisition::SampleSource;
use crate::buffer::SampleBuffer;
use crate::config::SimulatorConfig;
use crate::error::{AcquisitionError, InvalidInput, SimulationError};

/// Shape of the simulated signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Waveform {
    Sine,
    /// Sawtooth that climbs over a period and drops back at once.
    RisingRamp,
    /// Sawtooth that jumps up and falls over a period.
    FallingRamp,
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::RisingRamp => "rising-ramp",
            Waveform::FallingRamp => "falling-ramp",
        };
        f.write_str(name)
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Waveform::Sine),
            "rising-ramp" => Ok(Waveform::RisingRamp),
            "falling-ramp" => Ok(Waveform::FallingRamp),
            other => Err(format!(
                "unknown waveform '{other}' (expected sine, rising-ramp or falling-ramp)"
            )),
        }
    }
}

/// Offset added to ramps so their low end stays clear of zero.
const RAMP_BASE: i32 = 100;

/// Synthetic ADC.
#[derive(Debug, Clone)]
pub struct SignalSimulator {
    config: SimulatorConfig,
    rng: StdRng,
}

impl SignalSimulator {
    pub fn new(config: SimulatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Fills `samples` with `waveform` at `frequency` Hz, as taken at
    /// `sample_rate` Hz, with up to ±`noise`/2 of uniform noise.
    ///
    /// Accuracy of the analysis is only expected below a third of the
    /// sample rate; the simulator itself only refuses the Nyquist limit.
    pub fn fill(
        &mut self,
        waveform: Waveform,
        frequency: f32,
        noise: u16,
        samples: &mut [u16],
        sample_rate: u32,
    ) -> Result<(), SimulationError> {
        if frequency.is_nan() || frequency <= 0.0 {
            return Err(SimulationError::NonPositiveFrequency(frequency));
        }
        if noise > self.config.max_noise {
            return Err(SimulationError::NoiseTooLarge {
                noise,
                max: self.config.max_noise,
            });
        }
        if sample_rate == 0 {
            return Err(InvalidInput::ZeroSampleRate.into());
        }
        if samples.is_empty() {
            return Err(InvalidInput::EmptyBuffer.into());
        }
        let nyquist = sample_rate as f32 / 2.0;
        if frequency >= nyquist {
            return Err(SimulationError::AboveNyquist { frequency, nyquist });
        }

        let full_scale = self.config.max_adc_value as i32;
        let amplitude = self.rng.gen_range(0..(full_scale / 20).max(1)) + full_scale * 2 / 5;
        let offset = self.rng.gen_range(0..(full_scale / 10).max(1)) + full_scale * 2 / 5;

        // Period in samples; fractional, so ramps are not rounded to whole samples.
        let period = sample_rate as f64 / frequency as f64;

        log::trace!(
            "simulating {waveform} at {frequency} Hz: amplitude={amplitude} offset={offset} noise={noise} len={}",
            samples.len()
        );

        let mut phase = period / 2.0;
        for (i, sample) in samples.iter_mut().enumerate() {
            let n = if noise > 0 {
                self.rng.gen_range(0..noise as i32) - noise as i32 / 2
            } else {
                0
            };

            let value = match waveform {
                Waveform::Sine => {
                    (amplitude as f64 * (TAU * i as f64 / period).sin()) as i32 + offset + n
                }
                Waveform::RisingRamp => {
                    (phase / period * 2.0 * amplitude as f64) as i32 + RAMP_BASE + n
                }
                Waveform::FallingRamp => {
                    ((period - phase) / period * 2.0 * amplitude as f64) as i32 + RAMP_BASE + n
                }
            };
            *sample = value.clamp(0, full_scale) as u16;

            phase += 1.0;
            if phase > period {
                phase -= period;
            }
        }
        Ok(())
    }

    /// Allocates and fills a new buffer of `len` samples.
    pub fn generate_buffer(
        &mut self,
        waveform: Waveform,
        frequency: f32,
        noise: u16,
        len: usize,
        sample_rate: u32,
    ) -> Result<SampleBuffer, SimulationError> {
        let mut buffer = SampleBuffer::zeroed(len, sample_rate);
        self.fill(waveform, frequency, noise, buffer.samples_mut(), sample_rate)?;
        Ok(buffer)
    }
}

/// A [`SampleSource`] backed by the simulator, producing the same kind of
/// signal on every fill.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    simulator: SignalSimulator,
    waveform: Waveform,
    frequency: f32,
    noise: u16,
    sample_rate: u32,
}

impl SimulatedSource {
    pub fn new(
        simulator: SignalSimulator,
        waveform: Waveform,
        frequency: f32,
        noise: u16,
        sample_rate: u32,
    ) -> Self {
        Self {
            simulator,
            waveform,
            frequency,
            noise,
            sample_rate,
        }
    }
}

impl SampleSource for SimulatedSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill(&mut self, buf: &mut [u16]) -> Result<usize, AcquisitionError> {
        self.simulator
            .fill(self.waveform, self.frequency, self.noise, buf, self.sample_rate)?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 30_000;

    fn simulator(seed: u64) -> SignalSimulator {
        SignalSimulator::new(SimulatorConfig::default(), seed)
    }

    #[test]
    fn same_seed_same_signal() {
        let a = simulator(7).generate_buffer(Waveform::Sine, 440.0, 300, 2000, RATE).unwrap();
        let b = simulator(7).generate_buffer(Waveform::Sine, 440.0, 300, 2000, RATE).unwrap();
        let c = simulator(8).generate_buffer(Waveform::Sine, 440.0, 300, 2000, RATE).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clean_sine_stays_inside_the_adc_range() {
        let mut sim = simulator(1);
        for _ in 0..20 {
            let buffer = sim.generate_buffer(Waveform::Sine, 440.0, 0, 2000, RATE).unwrap();
            let min = *buffer.samples().iter().min().unwrap();
            let max = *buffer.samples().iter().max().unwrap();
            // amplitude in [1638, 1842), offset in [1638, 2047)
            assert!(max <= 4095);
            assert!(max - min >= 2 * 1630, "span {}", max - min);
            assert!(max - min <= 2 * 1842);
        }
    }

    #[test]
    fn noisy_signals_are_clamped() {
        let mut sim = simulator(3);
        for waveform in [Waveform::Sine, Waveform::RisingRamp, Waveform::FallingRamp] {
            let buffer = sim.generate_buffer(waveform, 1000.0, 600, 5000, RATE).unwrap();
            assert!(buffer.samples().iter().all(|&s| s <= 4095));
        }
    }

    #[test]
    fn rising_ramp_drops_once_per_period() {
        let buffer = simulator(5)
            .generate_buffer(Waveform::RisingRamp, 300.0, 0, 3000, RATE)
            .unwrap();
        let drops = buffer.samples().windows(2).filter(|w| w[1] < w[0]).count();
        // 3000 samples at 100 samples per period
        assert!((29..=31).contains(&drops), "{drops} drops");
    }

    #[test]
    fn falling_ramp_jumps_once_per_period() {
        let buffer = simulator(5)
            .generate_buffer(Waveform::FallingRamp, 300.0, 0, 3000, RATE)
            .unwrap();
        let jumps = buffer.samples().windows(2).filter(|w| w[1] > w[0]).count();
        assert!((29..=31).contains(&jumps), "{jumps} jumps");
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let mut sim = simulator(0);
        assert_eq!(
            sim.generate_buffer(Waveform::Sine, 0.0, 0, 100, RATE),
            Err(SimulationError::NonPositiveFrequency(0.0))
        );
        assert!(matches!(
            sim.generate_buffer(Waveform::Sine, 15_000.0, 0, 100, RATE),
            Err(SimulationError::AboveNyquist { .. })
        ));
        assert_eq!(
            sim.generate_buffer(Waveform::Sine, 440.0, 601, 100, RATE),
            Err(SimulationError::NoiseTooLarge { noise: 601, max: 600 })
        );
        assert_eq!(
            sim.generate_buffer(Waveform::Sine, 440.0, 0, 0, RATE),
            Err(SimulationError::InvalidBuffer(InvalidInput::EmptyBuffer))
        );
        assert_eq!(
            sim.generate_buffer(Waveform::Sine, 440.0, 0, 100, 0),
            Err(SimulationError::InvalidBuffer(InvalidInput::ZeroSampleRate))
        );
    }

    #[test]
    fn waveform_names_round_trip() {
        for waveform in [Waveform::Sine, Waveform::RisingRamp, Waveform::FallingRamp] {
            assert_eq!(waveform.to_string().parse::<Waveform>(), Ok(waveform));
        }
        assert!("square".parse::<Waveform>().is_err());
    }

    #[test]
    fn simulated_source_fills_completely() {
        let mut source = SimulatedSource::new(simulator(2), Waveform::Sine, 220.0, 0, RATE);
        let mut buf = vec![0u16; 512];
        assert_eq!(source.fill(&mut buf).unwrap(), 512);
        assert_eq!(source.sample_rate(), RATE);
        assert!(buf.iter().any(|&s| s != 0));
    }
}
