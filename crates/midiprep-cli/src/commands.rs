//! Batch drivers behind each subcommand.
//!
//! Files are processed one at a time. A file the library rejects is logged
//! and skipped; a broken invariant stops the whole run.

use anyhow::{bail, Context, Result};
use midiprep::{Pipeline, VoiceDataset};
use prepconf::PrepConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const MIDI_EXTENSIONS: &[&str] = &["mid", "midi"];
const JSON_EXTENSIONS: &[&str] = &["json"];

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn print(&self) {
        println!(
            "processed {}, skipped {}",
            self.processed,
            self.skipped.len()
        );
        for (path, reason) in &self.skipped {
            println!("  skipped {}: {}", path.display(), reason);
        }
    }
}

struct Job {
    input: PathBuf,
    output: PathBuf,
}

pub fn quantize(config: &PrepConfig, input: &Path, output: &Path) -> Result<BatchReport> {
    let pipeline = Pipeline::new(config);
    let jobs = plan(input, output, MIDI_EXTENSIONS, "mid")?;
    run_batch(jobs, |bytes| Ok(pipeline.quantize_to_midi(bytes)?))
}

pub fn extract(
    config: &PrepConfig,
    input: &Path,
    output: &Path,
    normalized: bool,
) -> Result<BatchReport> {
    let pipeline = Pipeline::new(config);
    let jobs = plan(input, output, MIDI_EXTENSIONS, "json")?;
    run_batch(jobs, |bytes| {
        let dataset = if normalized {
            pipeline.extract_normalized(bytes)?
        } else {
            pipeline.extract(bytes)?
        };
        Ok(dataset.to_json()?.into_bytes())
    })
}

pub fn reconstruct(config: &PrepConfig, input: &Path, output: &Path) -> Result<BatchReport> {
    let pipeline = Pipeline::new(config);
    let jobs = plan(input, output, JSON_EXTENSIONS, "mid")?;
    run_batch(jobs, |bytes| {
        let dataset: VoiceDataset = serde_json::from_slice(bytes)?;
        Ok(pipeline.reconstruct(&dataset)?.to_midi())
    })
}

/// Pair every input file with its output path.
///
/// A file input maps to `output` (or into it, if it is a directory). A
/// directory input is walked recursively and mirrored under `output`.
fn plan(input: &Path, output: &Path, extensions: &[&str], out_ext: &str) -> Result<Vec<Job>> {
    if input.is_file() {
        let output = if output.is_dir() {
            let name = input
                .file_name()
                .with_context(|| format!("Input has no file name: {}", input.display()))?;
            output.join(name).with_extension(out_ext)
        } else {
            output.to_path_buf()
        };
        return Ok(vec![Job {
            input: input.to_path_buf(),
            output,
        }]);
    }

    if !input.is_dir() {
        bail!("Input not found: {}", input.display());
    }

    let mut jobs = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(input)
            .with_context(|| format!("{} is outside {}", entry.path().display(), input.display()))?;
        jobs.push(Job {
            input: entry.path().to_path_buf(),
            output: output.join(relative).with_extension(out_ext),
        });
    }

    debug!(count = jobs.len(), input = %input.display(), "planned batch");
    Ok(jobs)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Rejected inputs are skipped; anything else aborts the run.
fn is_skippable(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<midiprep::Error>() {
        Some(e) => e.is_skippable(),
        None => err.downcast_ref::<serde_json::Error>().is_some(),
    }
}

fn run_batch(
    jobs: Vec<Job>,
    mut process: impl FnMut(&[u8]) -> Result<Vec<u8>>,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();

    for job in jobs {
        let bytes = match fs::read(&job.input) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %job.input.display(), error = %e, "skipping unreadable file");
                report.skipped.push((job.input, e.to_string()));
                continue;
            }
        };

        match process(&bytes) {
            Ok(out) => {
                if let Some(parent) = job.output.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent).with_context(|| {
                            format!("Failed to create directory {}", parent.display())
                        })?;
                    }
                }
                fs::write(&job.output, out)
                    .with_context(|| format!("Failed to write {}", job.output.display()))?;
                debug!(input = %job.input.display(), output = %job.output.display(), "processed");
                report.processed += 1;
            }
            Err(err) if is_skippable(&err) => {
                warn!(file = %job.input.display(), error = %err, "skipping file");
                report.skipped.push((job.input, err.to_string()));
            }
            Err(err) => {
                return Err(err.context(format!("Aborting batch at {}", job.input.display())));
            }
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped.len(),
        "batch complete"
    );
    Ok(report)
}
