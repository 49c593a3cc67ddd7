//! Configuration loading for midiprep.
//!
//! Every stage of the pipeline reads its parameters from here, so the crate
//! stays dependency-light and knows nothing about MIDI.
//!
//! # Sections
//!
//! - **Quantize** (`QuantizeConfig`): target tempo and the tempo-correction
//!   thresholds used by the normalizer.
//! - **Extract** (`ExtractConfig`): pitch bounds and the allowed time
//!   signature denominators checked before segmentation.
//! - **Telemetry** (`TelemetryConfig`): log level for the CLI subscriber.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/midiprep/config.toml` (system)
//! 2. `~/.config/midiprep/config.toml` (user)
//! 3. `./midiprep.toml` (local override, or the `--config` path)
//! 4. Environment variables (`MIDIPREP_*`)
//!
//! # Example Config
//!
//! ```toml
//! [quantize]
//! bpm = 120.0
//! tempo_thresholds = [60.0, 200.0]
//! max_tempo_bpm = 300.0
//!
//! [extract]
//! pitch_bounds = [24, 108]
//! denominators = [2, 4, 8]
//!
//! [telemetry]
//! log_level = "info"
//! ```

pub mod extract;
pub mod loader;
pub mod quantize;

pub use extract::ExtractConfig;
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use quantize::QuantizeConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Logging settings for the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    /// Default: "info"
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Complete midiprep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PrepConfig {
    #[serde(default)]
    pub quantize: QuantizeConfig,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl PrepConfig {
    /// Load configuration from an optional path and report where values came from.
    ///
    /// The merged result is validated before it is returned.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = PrepConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quantize.validate()?;
        self.extract.validate()?;
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# midiprep configuration\n\n");

        output.push_str("[quantize]\n");
        output.push_str(&format!("bpm = {:?}\n", self.quantize.bpm));
        output.push_str(&format!(
            "tempo_thresholds = [{:?}, {:?}]\n",
            self.quantize.tempo_thresholds[0], self.quantize.tempo_thresholds[1]
        ));
        output.push_str(&format!(
            "max_tempo_bpm = {:?}\n",
            self.quantize.max_tempo_bpm
        ));

        output.push_str("\n[extract]\n");
        output.push_str(&format!(
            "pitch_bounds = [{}, {}]\n",
            self.extract.pitch_bounds[0], self.extract.pitch_bounds[1]
        ));
        let denominators: Vec<String> = self
            .extract
            .denominators
            .iter()
            .map(|d| d.to_string())
            .collect();
        output.push_str(&format!("denominators = [{}]\n", denominators.join(", ")));

        output.push_str("\n[telemetry]\n");
        output.push_str(&format!("log_level = \"{}\"\n", self.telemetry.log_level));

        output
    }
}
