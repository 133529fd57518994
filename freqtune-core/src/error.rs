//! # Error Types
//!
//! Every fallible operation in the core returns one of these enums.
//! `ConstantSignal` and `InsufficientEdges` are ordinary "no tone" outcomes,
//! while `InvalidInput` marks a malformed buffer handed in by the caller.

use thiserror::Error;

/// Malformed buffer handed to an analysis stage.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("sample buffer is empty")]
    EmptyBuffer,

    #[error("sample rate is zero")]
    ZeroSampleRate,

    #[error("sample interval is not positive")]
    NonPositiveInterval,
}

/// Errors returned by [`SignalStatistics::compute`](crate::statistics::SignalStatistics::compute)
/// and [`FrequencyEstimator::analyze`](crate::estimator::FrequencyEstimator::analyze).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// Amplitude span at or below the noise floor.
    #[error("constant signal (amplitude span {span})")]
    ConstantSignal { span: u16 },

    /// Fewer than two rising edges were found.
    #[error("insufficient rising edges ({edges} found, 2 needed)")]
    InsufficientEdges { edges: u32 },
}

impl AnalysisError {
    /// True for outcomes that just mean "no tone in this buffer".
    pub fn is_no_tone(&self) -> bool {
        matches!(
            self,
            AnalysisError::ConstantSignal { .. } | AnalysisError::InsufficientEdges { .. }
        )
    }
}

/// Frequency outside what the note mapper covers.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum NoteError {
    #[error("{0} Hz is below the lowest mapped note")]
    BelowRange(f32),

    #[error("{0} Hz is above the highest mapped note")]
    AboveRange(f32),

    #[error("frequency is not a finite number")]
    NotFinite,
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SimulationError {
    #[error("signal frequency must be positive, got {0} Hz")]
    NonPositiveFrequency(f32),

    #[error("signal frequency {frequency} Hz is at or above the Nyquist limit of {nyquist} Hz")]
    AboveNyquist { frequency: f32, nyquist: f32 },

    #[error("noise amplitude {noise} exceeds the maximum of {max}")]
    NoiseTooLarge { noise: u16, max: u16 },

    #[error(transparent)]
    InvalidBuffer(#[from] InvalidInput),
}

/// Errors at the boundary with whatever produces samples.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("short read: requested {requested} samples, got {filled}")]
    ShortRead { requested: usize, filled: usize },

    #[error("sample source disconnected")]
    Disconnected,

    #[error("sample source failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("audio device error: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
