use crate::extract::VoiceDataset;
use crate::midi_writer::{self, NoteTrack, TrackLayout};
use crate::note::{Note, TimeSignatureChange};
use crate::segment::tick_unit;
use serde::{Deserialize, Serialize};

/// Voice lists mapped back to seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedScore {
    pub bpm: f64,
    pub time_signatures: Vec<TimeSignatureChange>,
    pub melody: Vec<Note<f64>>,
    pub bass: Vec<Note<f64>>,
    pub texture: Vec<Note<f64>>,
}

impl ReconstructedScore {
    pub fn note_count(&self) -> usize {
        self.melody.len() + self.bass.len() + self.texture.len()
    }

    /// Three tracks in the order Melody, Texture, Bass.
    pub fn to_midi(&self) -> Vec<u8> {
        midi_writer::write_smf(
            &TrackLayout {
                bpm: self.bpm,
                time_signatures: &self.time_signatures,
                key_signatures: &[],
            },
            &[
                NoteTrack {
                    name: "Melody",
                    notes: &self.melody,
                },
                NoteTrack {
                    name: "Texture",
                    notes: &self.texture,
                },
                NoteTrack {
                    name: "Bass",
                    notes: &self.bass,
                },
            ],
        )
    }
}

/// Scale every segment's ticks by that segment's tick unit.
pub fn reconstruct(dataset: &VoiceDataset, bpm: f64) -> crate::Result<ReconstructedScore> {
    dataset.check_shape()?;

    let mut score = ReconstructedScore {
        bpm,
        time_signatures: dataset.ts.clone(),
        melody: Vec::new(),
        bass: Vec::new(),
        texture: Vec::new(),
    };

    for (i, ts) in dataset.ts.iter().enumerate() {
        let unit = tick_unit(bpm, ts.denominator);
        let to_seconds = |n: &Note<i64>| n.map_time(|tick| tick as f64 * unit);

        score.melody.extend(dataset.melody[i].iter().map(to_seconds));
        score.bass.extend(dataset.bass[i].iter().map(to_seconds));
        score.texture.extend(dataset.texture[i].iter().map(to_seconds));
    }

    Ok(score)
}
