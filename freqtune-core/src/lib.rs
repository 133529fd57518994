// freqtune-core/src/lib.rs

//! The core logic for the frequency tuner.
//! This crate turns buffers of unsigned ADC samples into signal statistics,
//! a fundamental frequency with a quality figure, and the nearest
//! equal-tempered note with its deviation in cents. It is completely
//! headless: acquisition and display sit behind [`acquisition::SampleSource`]
//! and [`tuner::Reading`].

pub mod acquisition;
#[cfg(feature = "capture")]
pub mod audio;
pub mod buffer;
pub mod config;
pub mod error;
pub mod estimator;
mod filter;
pub mod notes;
pub mod simulator;
pub mod statistics;
pub mod tuner;

pub use acquisition::{acquire, SampleSource};
pub use buffer::SampleBuffer;
pub use config::{AnalysisConfig, Smoothing, TunerConfig};
pub use error::{AcquisitionError, AnalysisError, ConfigError, InvalidInput, NoteError, SimulationError};
pub use estimator::{Confidence, FrequencyAnalysis, FrequencyEstimator};
pub use notes::{NoteMapper, NoteMatch, NoteNaming};
pub use simulator::{SignalSimulator, SimulatedSource, Waveform};
pub use statistics::SignalStatistics;
pub use tuner::{Reading, ReadingStatus, Tuner};
