//! Segmentation and voice extraction settings.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Preconditions checked before a file is segmented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Inclusive `[lowest, highest]` MIDI pitch a track may contain.
    /// Default: [24, 108]
    #[serde(default = "ExtractConfig::default_pitch_bounds")]
    pub pitch_bounds: [u8; 2],

    /// Time signature denominators the segmenter accepts.
    /// Default: [2, 4, 8]
    #[serde(default = "ExtractConfig::default_denominators")]
    pub denominators: Vec<u8>,
}

impl ExtractConfig {
    fn default_pitch_bounds() -> [u8; 2] {
        [24, 108]
    }

    fn default_denominators() -> Vec<u8> {
        vec![2, 4, 8]
    }

    pub fn allows_denominator(&self, denominator: u8) -> bool {
        self.denominators.contains(&denominator)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let [low, high] = self.pitch_bounds;
        if low > high || high > 127 {
            return Err(ConfigError::Invalid(format!(
                "extract.pitch_bounds must satisfy low <= high <= 127, got [{low}, {high}]"
            )));
        }
        if self.denominators.is_empty() {
            return Err(ConfigError::Invalid(
                "extract.denominators must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self.denominators.iter().find(|d| !d.is_power_of_two()) {
            return Err(ConfigError::Invalid(format!(
                "extract.denominators must be powers of two, got {bad}"
            )));
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            pitch_bounds: Self::default_pitch_bounds(),
            denominators: Self::default_denominators(),
        }
    }
}
