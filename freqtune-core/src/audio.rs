//! # Audio Capture Module
//!
//! Live input through CPAL (Cross-Platform Audio Library), exposed as a
//! [`SampleSource`] so it can feed the same analysis chain as an ADC.
//!
//! ## Features
//! - Automatic selection of the default input device
//! - Mono 32-bit float stream near a requested sample rate
//! - Frames forwarded from the audio callback over a bounded channel
//! - Numbered frames, so a dropped frame never ends up inside a buffer
//! - Conversion to 12-bit unsigned samples centred at mid-scale

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use crate::acquisition::SampleSource;
use crate::error::AcquisitionError;

/// Samples per frame sent from the audio callback.
pub const FRAME_SIZE: usize = 1024;

/// Frames buffered between the callback and the consumer before new ones are dropped.
const FRAME_QUEUE: usize = 64;

/// Full scale of the converted samples (12 bit).
pub const CAPTURE_FULL_SCALE: u16 = 4095;

/// One block of audio from the callback, numbered in capture order.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub index: u64,
    pub samples: Vec<f32>,
}

/// Starts audio capture from the default input device.
///
/// # Arguments
/// * `sender` - Channel for complete frames of `FRAME_SIZE` samples; frames
///   that do not fit are dropped but still consume an index
/// * `target_rate` - Desired sample rate in Hz; the nearest supported one is used
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Stream handle (capture stops when dropped) and actual rate
/// * `Err(e)` - No usable device or format
pub fn start_audio_capture(sender: Sender<AudioFrame>, target_rate: u32) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("No suitable mono f32 input format found"))?;

    let rate = target_rate.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!("Selected sample rate: {} Hz", sample_rate);

    let err_fn = |err| warn!("An error occurred on the audio stream: {}", err);

    // Accumulates callback data until a full frame is available.
    let mut pending = Vec::with_capacity(FRAME_SIZE * 2);
    let mut next_index = 0u64;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= FRAME_SIZE {
                let frame = AudioFrame {
                    index: next_index,
                    samples: pending[..FRAME_SIZE].to_vec(),
                };
                next_index += 1;
                if sender.try_send(frame).is_err() {
                    warn!("Consumer is behind, dropping an audio frame");
                }
                pending.drain(..FRAME_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks a mono f32 configuration whose rate range is closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            min_diff.min(max_diff)
        })
}

/// Maps a float sample in [-1, 1] onto 0..=`CAPTURE_FULL_SCALE`.
pub fn to_adc_scale(sample: f32) -> u16 {
    let half = (CAPTURE_FULL_SCALE as f32 + 1.0) / 2.0;
    (sample.clamp(-1.0, 1.0) * (half - 1.0) + half).clamp(0.0, CAPTURE_FULL_SCALE as f32) as u16
}

/// Joins numbered frames into contiguous runs of samples.
///
/// A gap in the frame numbers discards whatever was collected before it, so
/// every buffer handed out is uniformly sampled.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Vec<f32>,
    next_index: u64,
    dropped: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: AudioFrame) {
        if frame.index != self.next_index {
            let missing = frame.index.saturating_sub(self.next_index);
            self.dropped += missing;
            warn!(
                "{missing} audio frame(s) dropped ({} so far), discarding {} pending samples",
                self.dropped,
                self.pending.len()
            );
            self.pending.clear();
        }
        self.next_index = frame.index + 1;
        self.pending.extend_from_slice(&frame.samples);
    }

    /// Fills `buf` from the collected samples, if there are enough.
    pub fn take(&mut self, buf: &mut [u16]) -> bool {
        if self.pending.len() < buf.len() {
            return false;
        }
        for (dst, &src) in buf.iter_mut().zip(self.pending.iter()) {
            *dst = to_adc_scale(src);
        }
        self.pending.drain(..buf.len());
        true
    }

    /// Frames lost so far because the consumer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }
}

/// Live input as a [`SampleSource`].
///
/// Holds the CPAL stream; dropping the source stops capture. The stream is
/// not `Send` on every platform, so create the source on the thread that
/// reads from it.
pub struct CaptureSource {
    _stream: cpal::Stream,
    frames: Receiver<AudioFrame>,
    assembler: FrameAssembler,
    sample_rate: u32,
}

impl CaptureSource {
    pub fn open(target_rate: u32) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(FRAME_QUEUE);
        let (stream, sample_rate) = start_audio_capture(tx, target_rate)?;
        Ok(Self {
            _stream: stream,
            frames: rx,
            assembler: FrameAssembler::new(),
            sample_rate,
        })
    }
}

impl SampleSource for CaptureSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill(&mut self, buf: &mut [u16]) -> Result<usize, AcquisitionError> {
        while !self.assembler.take(buf) {
            let frame = self
                .frames
                .recv()
                .map_err(|_| AcquisitionError::Disconnected)?;
            self.assembler.push(frame);
        }
        Ok(buf.len())
    }
}
