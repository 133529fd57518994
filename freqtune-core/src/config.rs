//! # Configuration
//!
//! All tunable constants of the analysis chain live here as plain fields with
//! defaults, so a caller can override any of them from a JSON file or flags.
//! Missing fields in a JSON file fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::ConfigError;
use crate::notes::NoteNaming;

/// Smoothing applied to samples before they reach statistics and segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    None,
    /// Causal moving average over `window` samples.
    /// Blurs high notes; keep it off above a few hundred Hz.
    MovingAverage { window: usize },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::None
    }
}

/// Parameters of the statistics and frequency estimation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Largest amplitude span still treated as "no signal" (default: 8).
    /// Also sets the fallback offset for thresholds of lopsided signals.
    pub noise_floor: u16,

    /// The hysteresis band covers mean ± (distance to extreme) / divisor (default: 3).
    pub hysteresis_divisor: u16,

    /// Length of the initial run used to pick the start state (default: 4).
    /// Must be even and greater than 2.
    pub min_tick_spacing: usize,

    /// Capacity of the edge list used for mean period and quality (default: 200).
    pub max_stored_edges: usize,

    pub smoothing: Smoothing,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            noise_floor: 8,
            hysteresis_divisor: 3,
            min_tick_spacing: 4,
            max_stored_edges: 200,
            smoothing: Smoothing::None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.noise_floor == 0 {
            return Err(ConfigError::Invalid("noise_floor must be positive".into()));
        }
        if self.hysteresis_divisor == 0 {
            return Err(ConfigError::Invalid("hysteresis_divisor must be positive".into()));
        }
        if self.min_tick_spacing <= 2 || self.min_tick_spacing % 2 != 0 {
            return Err(ConfigError::Invalid(format!(
                "min_tick_spacing must be even and greater than 2, got {}",
                self.min_tick_spacing
            )));
        }
        if self.max_stored_edges < 3 {
            return Err(ConfigError::Invalid(format!(
                "max_stored_edges must be at least 3, got {}",
                self.max_stored_edges
            )));
        }
        if let Smoothing::MovingAverage { window } = self.smoothing {
            if window == 0 {
                return Err(ConfigError::Invalid("smoothing window must be at least 1".into()));
            }
        }
        Ok(())
    }
}

/// Parameters of the synthetic signal generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Largest peak-to-peak noise accepted by `SignalSimulator::fill` (default: 600).
    pub max_noise: u16,
    /// Full scale of the simulated ADC (default: 4095, i.e. 12 bit).
    pub max_adc_value: u16,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_noise: 600,
            max_adc_value: 4095,
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_adc_value < 20 {
            return Err(ConfigError::Invalid(format!(
                "max_adc_value must be at least 20, got {}",
                self.max_adc_value
            )));
        }
        if self.max_noise > self.max_adc_value {
            return Err(ConfigError::Invalid(format!(
                "max_noise ({}) exceeds max_adc_value ({})",
                self.max_noise, self.max_adc_value
            )));
        }
        Ok(())
    }
}

/// Limits that decide how a reading is presented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    /// Largest quality / mean period ratio still shown as confident (default: 0.15).
    pub max_relative_quality: f32,
    /// Largest relative gap between classic and mean-period frequency (default: 0.1).
    pub max_frequency_divergence: f32,
    /// Correction applied to the measured frequency before note lookup, in cents.
    pub tuning_offset_cents: i32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            max_relative_quality: 0.15,
            max_frequency_divergence: 0.1,
            tuning_offset_cents: 0,
        }
    }
}

/// Top-level configuration, the object saved to and loaded from disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub analysis: AnalysisConfig,
    pub simulator: SimulatorConfig,
    pub reading: ReadingConfig,
    pub naming: NoteNaming,
}

impl TunerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        self.simulator.validate()?;
        if !is_positive(self.reading.max_relative_quality) {
            return Err(ConfigError::Invalid("max_relative_quality must be positive".into()));
        }
        if !is_positive(self.reading.max_frequency_divergence) {
            return Err(ConfigError::Invalid("max_frequency_divergence must be positive".into()));
        }
        Ok(())
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Loads and validates a configuration from a JSON file.
pub fn load(path: impl AsRef<Path>) -> Result<TunerConfig, ConfigError> {
    let mut file = File::open(path)?;
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    let config: TunerConfig = serde_json::from_str(&data)?;
    config.validate()?;
    Ok(config)
}

/// Writes a configuration as pretty-printed JSON.
pub fn save(config: &TunerConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let json_string = serde_json::to_string_pretty(config)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TunerConfig::default().validate().is_ok());
    }

    #[test]
    fn odd_tick_spacing_is_rejected() {
        let config = AnalysisConfig {
            min_tick_spacing: 5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = AnalysisConfig {
            min_tick_spacing: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_smoothing_window_is_rejected() {
        let config = AnalysisConfig {
            smoothing: Smoothing::MovingAverage { window: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let json = r#"{ "analysis": { "hysteresis_divisor": 4 }, "naming": "helmholtz" }"#;
        let config: TunerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.analysis.hysteresis_divisor, 4);
        assert_eq!(config.analysis.noise_floor, 8);
        assert_eq!(config.analysis.max_stored_edges, 200);
        assert_eq!(config.naming, NoteNaming::Helmholtz);
        assert_eq!(config.simulator, SimulatorConfig::default());
    }

    #[test]
    fn smoothing_round_trips_through_json() {
        let config = TunerConfig {
            analysis: AnalysisConfig {
                smoothing: Smoothing::MovingAverage { window: 5 },
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: TunerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = std::env::temp_dir().join(format!("freqtune-config-{}.json", std::process::id()));
        let config = TunerConfig {
            reading: ReadingConfig {
                tuning_offset_cents: -12,
                ..Default::default()
            },
            ..Default::default()
        };
        save(&config, &path).unwrap();
        let loaded = load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let path = std::env::temp_dir().join(format!("freqtune-bad-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "analysis": { "min_tick_spacing": 3 } }"#).unwrap();
        let result = load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
