//! # Tuner Module
//!
//! Runs one buffer through the whole chain (statistics, frequency estimation,
//! note lookup) and condenses the outcome into a [`Reading`] for display.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::config::{ReadingConfig, Smoothing, TunerConfig};
use crate::error::{AnalysisError, NoteError};
use crate::estimator::{Confidence, FrequencyAnalysis, FrequencyEstimator};
use crate::notes::{NoteMapper, NoteMatch, SEMITONE_RATIO};
use crate::statistics::SignalStatistics;

/// How a reading should be presented (red / orange / green on a display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// No usable tone or no note in range.
    Invalid,
    /// A note was found but the measurement was irregular or too short.
    LowConfidence,
    Confident,
}

/// The value handed to a display after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub valid: bool,
    pub quality_ok: bool,
    /// Deviation from `note_name` in cents, 0 when invalid.
    pub cents: i32,
    pub note_name: Option<String>,
    /// Measured frequency after the tuning offset, in Hz.
    pub frequency: f32,
    pub status: ReadingStatus,
    /// Figures behind the reading; period and quality hold the
    /// [`UNDEFINED`](crate::estimator::UNDEFINED) sentinel when no tone was found.
    pub analysis: FrequencyAnalysis,
}

impl Reading {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            quality_ok: false,
            cents: 0,
            note_name: None,
            frequency: 0.0,
            status: ReadingStatus::Invalid,
            analysis: FrequencyAnalysis::undefined(),
        }
    }
}

/// Everything computed for one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerOutcome {
    pub statistics: SignalStatistics,
    pub analysis: FrequencyAnalysis,
    /// Classic frequency with the tuning offset applied.
    pub frequency: f32,
    pub note: Result<NoteMatch, NoteError>,
    pub quality_ok: bool,
}

/// Shifts `frequency` by `offset_cents` using the same linear cent
/// approximation as the note lookup.
pub fn apply_tuning_offset(frequency: f32, offset_cents: i32) -> f32 {
    if offset_cents == 0 {
        return frequency;
    }
    let factor = 1.0 + (SEMITONE_RATIO - 1.0) * offset_cents.unsigned_abs() as f32 / 100.0;
    if offset_cents > 0 {
        frequency * factor
    } else {
        frequency / factor
    }
}

/// The analysis chain with its configuration fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct Tuner {
    smoothing: Smoothing,
    estimator: FrequencyEstimator,
    mapper: NoteMapper,
    limits: ReadingConfig,
}

impl Tuner {
    pub fn new(config: TunerConfig) -> Self {
        Self {
            smoothing: config.analysis.smoothing,
            estimator: FrequencyEstimator::new(config.analysis),
            mapper: NoteMapper::new(config.naming),
            limits: config.reading,
        }
    }

    /// Runs statistics, estimation and note lookup on `buffer`.
    ///
    /// Only the first two stages can fail the call; a frequency outside the
    /// note table is kept in [`TunerOutcome::note`].
    pub fn analyze(&self, buffer: &SampleBuffer) -> Result<TunerOutcome, AnalysisError> {
        let statistics = SignalStatistics::compute(buffer, self.smoothing)?;
        let analysis = self.estimator.analyze(buffer, &statistics)?;
        let frequency = apply_tuning_offset(analysis.classic_frequency, self.limits.tuning_offset_cents);
        let note = self.mapper.nearest_note(frequency);
        let quality_ok = self.quality_ok(&analysis);
        Ok(TunerOutcome {
            statistics,
            analysis,
            frequency,
            note,
            quality_ok,
        })
    }

    /// Produces the display value for `buffer`.
    ///
    /// This function:
    /// 1. Analyzes the buffer; any analysis error gives an invalid reading
    /// 2. Rejects a classic frequency that is not positive
    /// 3. Judges the quality figures against the configured limits
    /// 4. Maps the offset frequency to a note; a range error gives an invalid reading
    pub fn process(&self, buffer: &SampleBuffer) -> Reading {
        let outcome = match self.analyze(buffer) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!("no reading: {err}");
                return Reading::invalid();
            }
        };

        if outcome.analysis.classic_frequency <= f32::MIN_POSITIVE {
            return Reading::invalid();
        }

        let note = match outcome.note {
            Ok(note) => note,
            Err(err) => {
                debug!("no note: {err}");
                return Reading {
                    analysis: outcome.analysis,
                    ..Reading::invalid()
                };
            }
        };

        Reading {
            valid: true,
            quality_ok: outcome.quality_ok,
            cents: note.cents,
            note_name: Some(note.name),
            frequency: outcome.frequency,
            status: if outcome.quality_ok {
                ReadingStatus::Confident
            } else {
                ReadingStatus::LowConfidence
            },
            analysis: outcome.analysis,
        }
    }

    fn quality_ok(&self, analysis: &FrequencyAnalysis) -> bool {
        if analysis.confidence() == Confidence::Low {
            return false;
        }
        if analysis.relative_quality() > self.limits.max_relative_quality {
            return false;
        }
        let classic = analysis.classic_frequency;
        let divergence = (classic - analysis.mean_period_frequency()).abs() / classic;
        divergence <= self.limits.max_frequency_divergence
    }
}
