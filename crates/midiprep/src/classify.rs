//! Melody / bass / texture split of one quantized segment.
//!
//! Notes sharing an onset form a chord: its first note goes to bass, its
//! last to melody, and anything in between to texture. Isolated onsets are
//! assigned by register relative to the most recent melody and bass pitches.

use crate::note::Note;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Melody,
    Bass,
    Texture,
}

/// Pitches of the latest melody and bass notes, carried across segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceState {
    pub last_melody: u8,
    pub last_bass: u8,
}

impl Default for VoiceState {
    fn default() -> Self {
        Self {
            last_melody: 108,
            last_bass: 24,
        }
    }
}

impl VoiceState {
    pub fn midpoint(&self) -> u8 {
        ((self.last_melody as u16 + self.last_bass as u16) / 2) as u8
    }

    /// Below the midpoint is bass; the midpoint itself is melody.
    pub fn by_register(&self, pitch: u8) -> Voice {
        if pitch < self.midpoint() {
            Voice::Bass
        } else {
            Voice::Melody
        }
    }

    fn record(&mut self, voice: Voice, pitch: u8) {
        match voice {
            Voice::Melody => self.last_melody = pitch,
            Voice::Bass => self.last_bass = pitch,
            Voice::Texture => {}
        }
    }
}

/// The three voices of one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSplit {
    pub melody: Vec<Note<i64>>,
    pub bass: Vec<Note<i64>>,
    pub texture: Vec<Note<i64>>,
}

impl VoiceSplit {
    pub fn len(&self) -> usize {
        self.melody.len() + self.bass.len() + self.texture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, voice: Voice, note: Note<i64>) {
        match voice {
            Voice::Melody => self.melody.push(note),
            Voice::Bass => self.bass.push(note),
            Voice::Texture => self.texture.push(note),
        }
    }
}

/// Assign a voice to every note of a segment sorted by `(start, pitch)`.
///
/// Returns one voice per input note, in input order, and the updated state.
pub fn assign_voices(notes: &[Note<i64>], mut state: VoiceState) -> (Vec<Voice>, VoiceState) {
    let mut voices = Vec::with_capacity(notes.len());
    let mut onset_seen = HashSet::new();
    let mut has_melody = false;
    let mut has_bass = false;

    for (i, note) in notes.iter().enumerate() {
        let first_at_onset = onset_seen.insert(note.start);

        let voice = match notes.get(i + 1) {
            None if first_at_onset => state.by_register(note.pitch),
            None => Voice::Melody,
            Some(next) => {
                let shares_onset = next.start == note.start;
                match (first_at_onset, shares_onset) {
                    (true, false) if !has_melody || !has_bass => Voice::Melody,
                    (true, false) => state.by_register(note.pitch),
                    (true, true) => Voice::Bass,
                    (false, false) => Voice::Melody,
                    (false, true) => Voice::Texture,
                }
            }
        };

        state.record(voice, note.pitch);
        has_melody |= voice == Voice::Melody;
        has_bass |= voice == Voice::Bass;
        voices.push(voice);
    }

    (voices, state)
}

/// Split a segment into voices, threading `state` through.
pub fn classify_segment(notes: &[Note<i64>], state: VoiceState) -> (VoiceSplit, VoiceState) {
    let (voices, state) = assign_voices(notes, state);
    let mut split = VoiceSplit::default();
    for (note, voice) in notes.iter().zip(voices) {
        split.push(voice, *note);
    }
    (split, state)
}
