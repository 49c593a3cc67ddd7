pub mod classify;
pub mod decode;
pub mod extract;
pub mod midi_writer;
pub mod normalize;
pub mod note;
pub mod pipeline;
pub mod reconstruct;
pub mod score;
pub mod segment;

#[cfg(test)]
mod test_support;

pub use classify::{assign_voices, classify_segment, Voice, VoiceSplit, VoiceState};
pub use decode::{decode, read_timed_score, DecodedMidi, RawEvent, TempoMap};
pub use extract::{Extractor, VoiceDataset};
pub use midi_writer::{write_smf, NoteTrack, TrackLayout, OUTPUT_PPQ};
pub use normalize::{
    pair_track, NormalizedScore, Normalizer, PairedTrack, PairingDiagnostics, TempoCorrection,
    TempoEstimate,
};
pub use note::{Key, KeySignatureChange, Note, TimeSignatureChange};
pub use pipeline::Pipeline;
pub use reconstruct::{reconstruct, ReconstructedScore};
pub use score::{TimedScore, TimedTrack};
pub use segment::{snap_onset, tick_unit, Segment, Segmenter, TICKS_PER_BEAT};

/// Errors from MIDI preparation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("no tempo event below {max_bpm} bpm")]
    NoTempoFound { max_bpm: f64 },

    #[error("track {track:?} spans pitches {min}..={max}, outside {low}..={high}")]
    PitchRangeViolation {
        track: String,
        min: u8,
        max: u8,
        low: u8,
        high: u8,
    },

    #[error("unsupported time signature denominator: {denominator}")]
    UnsupportedDenominator { denominator: u8 },

    #[error("malformed voice dataset: {0}")]
    MalformedDataset(String),

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Whether a batch run should log this file and move on.
    ///
    /// Only a broken invariant stops the run.
    pub fn is_skippable(&self) -> bool {
        !matches!(self, Self::InvariantViolation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
