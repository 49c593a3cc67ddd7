//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, ExtractConfig, PrepConfig, QuantizeConfig, TelemetryConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/midiprep/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("midiprep/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("midiprep.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<PrepConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_toml(&contents, path)
}

/// Parse config from a TOML string. Missing keys keep their defaults.
fn parse_toml(contents: &str, path: &Path) -> Result<PrepConfig, ConfigError> {
    let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut config = PrepConfig::default();

    if let Some(quantize) = table.get("quantize").and_then(|v| v.as_table()) {
        if let Some(v) = quantize.get("bpm").and_then(as_float) {
            config.quantize.bpm = v;
        }
        if let Some(v) = quantize.get("tempo_thresholds").and_then(|v| v.as_array()) {
            let values: Vec<f64> = v.iter().filter_map(as_float).collect();
            if values.len() != 2 {
                return Err(parse_err(format!(
                    "quantize.tempo_thresholds needs exactly two numbers, got {}",
                    v.len()
                )));
            }
            config.quantize.tempo_thresholds = [values[0], values[1]];
        }
        if let Some(v) = quantize.get("max_tempo_bpm").and_then(as_float) {
            config.quantize.max_tempo_bpm = v;
        }
    }

    if let Some(extract) = table.get("extract").and_then(|v| v.as_table()) {
        if let Some(v) = extract.get("pitch_bounds").and_then(|v| v.as_array()) {
            let values = as_u8_list(v, "extract.pitch_bounds").map_err(parse_err)?;
            if values.len() != 2 {
                return Err(parse_err(
                    "extract.pitch_bounds needs exactly two pitches".to_string(),
                ));
            }
            config.extract.pitch_bounds = [values[0], values[1]];
        }
        if let Some(v) = extract.get("denominators").and_then(|v| v.as_array()) {
            config.extract.denominators =
                as_u8_list(v, "extract.denominators").map_err(parse_err)?;
        }
    }

    if let Some(telemetry) = table.get("telemetry").and_then(|v| v.as_table()) {
        if let Some(v) = telemetry.get("log_level").and_then(|v| v.as_str()) {
            config.telemetry.log_level = v.to_string();
        }
    }

    Ok(config)
}

/// TOML integers are accepted where floats are expected (`bpm = 120`).
fn as_float(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

/// Every entry must be an integer in 0..=255.
fn as_u8_list(values: &[toml::Value], key: &str) -> Result<Vec<u8>, String> {
    values
        .iter()
        .map(|v| {
            v.as_integer()
                .and_then(|i| u8::try_from(i).ok())
                .ok_or_else(|| format!("{key} entries must be integers in 0..=255, got {v}"))
        })
        .collect()
}

/// Merge two configs, with `overlay` taking precedence.
///
/// A field is taken from `overlay` only when it differs from the compiled
/// default, so a file that sets one key does not reset the others.
pub fn merge_configs(base: PrepConfig, overlay: PrepConfig) -> PrepConfig {
    let quantize_default = QuantizeConfig::default();
    let extract_default = ExtractConfig::default();
    let telemetry_default = TelemetryConfig::default();

    PrepConfig {
        quantize: QuantizeConfig {
            bpm: if overlay.quantize.bpm != quantize_default.bpm {
                overlay.quantize.bpm
            } else {
                base.quantize.bpm
            },
            tempo_thresholds: if overlay.quantize.tempo_thresholds
                != quantize_default.tempo_thresholds
            {
                overlay.quantize.tempo_thresholds
            } else {
                base.quantize.tempo_thresholds
            },
            max_tempo_bpm: if overlay.quantize.max_tempo_bpm != quantize_default.max_tempo_bpm {
                overlay.quantize.max_tempo_bpm
            } else {
                base.quantize.max_tempo_bpm
            },
        },
        extract: ExtractConfig {
            pitch_bounds: if overlay.extract.pitch_bounds != extract_default.pitch_bounds {
                overlay.extract.pitch_bounds
            } else {
                base.extract.pitch_bounds
            },
            denominators: if overlay.extract.denominators != extract_default.denominators {
                overlay.extract.denominators
            } else {
                base.extract.denominators
            },
        },
        telemetry: TelemetryConfig {
            log_level: if overlay.telemetry.log_level != telemetry_default.log_level {
                overlay.telemetry.log_level
            } else {
                base.telemetry.log_level
            },
        },
    }
}

/// Apply environment variable overrides to config.
///
/// Unparseable values are ignored rather than failing the load.
pub fn apply_env_overrides(config: &mut PrepConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("MIDIPREP_BPM") {
        if let Ok(bpm) = v.parse() {
            config.quantize.bpm = bpm;
            sources.env_overrides.push("MIDIPREP_BPM".to_string());
        }
    }
    if let Ok(v) = env::var("MIDIPREP_PITCH_MIN") {
        if let Ok(pitch) = v.parse() {
            config.extract.pitch_bounds[0] = pitch;
            sources.env_overrides.push("MIDIPREP_PITCH_MIN".to_string());
        }
    }
    if let Ok(v) = env::var("MIDIPREP_PITCH_MAX") {
        if let Ok(pitch) = v.parse() {
            config.extract.pitch_bounds[1] = pitch;
            sources.env_overrides.push("MIDIPREP_PITCH_MAX".to_string());
        }
    }
    if let Ok(v) = env::var("MIDIPREP_DENOMINATORS") {
        if let Some(denominators) = parse_denominator_list(&v) {
            config.extract.denominators = denominators;
            sources.env_overrides.push("MIDIPREP_DENOMINATORS".to_string());
        }
    }
    if let Ok(v) = env::var("MIDIPREP_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("MIDIPREP_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Parse "2,4,8" into denominators. Any bad entry rejects the whole list.
fn parse_denominator_list(value: &str) -> Option<Vec<u8>> {
    value
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u8>().ok())
        .collect()
}
