//! Shared fixtures for CLI tests.

#![allow(dead_code)]

use assert_cmd::Command;
use midiprep::{Note, TimeSignatureChange, TimedScore, TimedTrack};
use std::path::Path;

/// `midiprep` with config discovery isolated to `home`.
pub fn midiprep_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("midiprep").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("MIDIPREP_BPM")
        .env_remove("MIDIPREP_PITCH_MIN")
        .env_remove("MIDIPREP_PITCH_MAX")
        .env_remove("MIDIPREP_DENOMINATORS")
        .env_remove("MIDIPREP_LOG_LEVEL");
    cmd
}

/// A short two-voice piece in 4/4, written at `bpm`.
pub fn sample_midi(bpm: f64) -> Vec<u8> {
    let beat = 60.0 / bpm;
    let mut notes = Vec::new();
    for i in 0..8 {
        let t = i as f64 * beat;
        notes.push(Note::new(48 + (i % 3) as u8, t, t + beat, 80));
        notes.push(Note::new(67 + (i % 5) as u8, t, t + beat / 2.0, 100));
    }
    TimedScore {
        tracks: vec![TimedTrack {
            name: "Piano".to_string(),
            notes,
            diagnostics: Default::default(),
        }],
        time_signatures: vec![TimeSignatureChange {
            numerator: 4,
            denominator: 4,
            time: 0.0,
        }],
        key_signatures: Vec::new(),
    }
    .to_midi(bpm)
}
