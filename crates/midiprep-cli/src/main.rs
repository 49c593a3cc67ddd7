//! midiprep - MIDI dataset preparation
//!
//! Subcommands:
//! - `midiprep quantize <input> <output>` - Rescale files onto the fixed tempo
//! - `midiprep extract <input> <output>` - Split files into melody/bass/texture JSON
//! - `midiprep reconstruct <input> <output>` - Rebuild MIDI from voice JSON
//! - `midiprep config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "midiprep")]
#[command(about = "Tempo normalization and voice extraction for MIDI datasets")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./midiprep.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescale MIDI files onto the configured tempo
    Quantize {
        /// MIDI file, or directory searched recursively for .mid/.midi
        input: PathBuf,

        /// Output file, or directory mirroring the input tree
        output: PathBuf,
    },

    /// Extract melody, bass and texture voices as JSON
    Extract {
        /// MIDI file, or directory searched recursively for .mid/.midi
        input: PathBuf,

        /// Output file, or directory mirroring the input tree
        output: PathBuf,

        /// Inputs were already written by `quantize`
        #[arg(long)]
        normalized: bool,
    },

    /// Rebuild a three-track MIDI file from voice JSON
    Reconstruct {
        /// JSON file, or directory searched recursively for .json
        input: PathBuf,

        /// Output file, or directory mirroring the input tree
        output: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Also list the files and environment variables that contributed
        #[arg(long)]
        sources: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }

    let (config, sources) = prepconf::PrepConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Quantize { input, output } => {
            let report = commands::quantize(&config, &input, &output)?;
            report.print();
        }
        Commands::Extract {
            input,
            output,
            normalized,
        } => {
            let report = commands::extract(&config, &input, &output, normalized)?;
            report.print();
        }
        Commands::Reconstruct { input, output } => {
            let report = commands::reconstruct(&config, &input, &output)?;
            report.print();
        }
        Commands::Config { sources: show } => {
            print!("{}", config.to_toml());
            if show {
                println!();
                for file in &sources.files {
                    println!("# file: {}", file.display());
                }
                for var in &sources.env_overrides {
                    println!("# env: {var}");
                }
            }
        }
    }

    Ok(())
}
