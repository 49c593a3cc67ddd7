use crate::midi_writer::{self, NoteTrack, TrackLayout};
use crate::normalize::PairingDiagnostics;
use crate::note::{KeySignatureChange, Note, TimeSignatureChange};
use serde::{Deserialize, Serialize};

/// One instrument track on the normalized timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTrack {
    pub name: String,
    pub notes: Vec<Note<f64>>,
    #[serde(default)]
    pub diagnostics: PairingDiagnostics,
}

impl TimedTrack {
    /// `(lowest, highest)` pitch, or `None` for an empty track.
    pub fn pitch_range(&self) -> Option<(u8, u8)> {
        let min = self.notes.iter().map(|n| n.pitch).min()?;
        let max = self.notes.iter().map(|n| n.pitch).max()?;
        Some((min, max))
    }
}

/// Tracks plus signature changes, all in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedScore {
    pub tracks: Vec<TimedTrack>,
    pub time_signatures: Vec<TimeSignatureChange>,
    pub key_signatures: Vec<KeySignatureChange>,
}

impl TimedScore {
    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }

    /// Encode as a format-1 SMF with a constant `bpm` tempo.
    pub fn to_midi(&self, bpm: f64) -> Vec<u8> {
        let tracks: Vec<NoteTrack<'_>> = self
            .tracks
            .iter()
            .map(|t| NoteTrack {
                name: &t.name,
                notes: &t.notes,
            })
            .collect();

        midi_writer::write_smf(
            &TrackLayout {
                bpm,
                time_signatures: &self.time_signatures,
                key_signatures: &self.key_signatures,
            },
            &tracks,
        )
    }
}
