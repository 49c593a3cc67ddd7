//! Tempo normalization settings.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Slowest tempo a 24-bit Set Tempo event can carry.
pub const MIN_BPM: f64 = 60_000_000.0 / 0xFF_FFFF as f64;

/// Parameters for the tempo normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizeConfig {
    /// Fixed output tempo every file is rescaled onto.
    /// Default: 120.0
    #[serde(default = "QuantizeConfig::default_bpm")]
    pub bpm: f64,

    /// `[slow, fast]` mean-tempo thresholds in bpm. At or below `slow` the
    /// beat time is doubled, at or above `fast` it is halved.
    /// Default: [60.0, 200.0]
    #[serde(default = "QuantizeConfig::default_tempo_thresholds")]
    pub tempo_thresholds: [f64; 2],

    /// Tempo events at or above this bpm are ignored as corrupt.
    /// Default: 300.0
    #[serde(default = "QuantizeConfig::default_max_tempo_bpm")]
    pub max_tempo_bpm: f64,
}

impl QuantizeConfig {
    fn default_bpm() -> f64 {
        120.0
    }

    fn default_tempo_thresholds() -> [f64; 2] {
        [60.0, 200.0]
    }

    fn default_max_tempo_bpm() -> f64 {
        300.0
    }

    /// Seconds per beat at the target tempo, before any correction.
    pub fn beat_time(&self) -> f64 {
        60.0 / self.bpm
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bpm.is_finite() && self.bpm >= MIN_BPM) {
            return Err(ConfigError::Invalid(format!(
                "quantize.bpm must be at least {MIN_BPM:.2} to fit a MIDI tempo event, got {}",
                self.bpm
            )));
        }
        let [slow, fast] = self.tempo_thresholds;
        if !(slow > 0.0 && slow < fast) {
            return Err(ConfigError::Invalid(format!(
                "quantize.tempo_thresholds must be increasing and positive, got [{slow}, {fast}]"
            )));
        }
        if self.max_tempo_bpm <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "quantize.max_tempo_bpm must be positive, got {}",
                self.max_tempo_bpm
            )));
        }
        Ok(())
    }
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            bpm: Self::default_bpm(),
            tempo_thresholds: Self::default_tempo_thresholds(),
            max_tempo_bpm: Self::default_max_tempo_bpm(),
        }
    }
}
