//! Voice extraction: segment a normalized score and split each segment.

use crate::classify::{classify_segment, VoiceState};
use crate::note::{Note, TimeSignatureChange};
use crate::score::TimedScore;
use crate::segment::Segmenter;
use prepconf::ExtractConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-segment voice lists in tick units, plus the time signatures that
/// define each segment.
///
/// Serialized as
/// `{"bass": [[[pitch, start, end, vel], ...], ...], "melody": ..., "texture": ..., "ts": [[num, den, time], ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceDataset {
    pub bass: Vec<Vec<Note<i64>>>,
    pub melody: Vec<Vec<Note<i64>>>,
    pub texture: Vec<Vec<Note<i64>>>,
    pub ts: Vec<TimeSignatureChange>,
}

impl VoiceDataset {
    pub fn segment_count(&self) -> usize {
        self.ts.len()
    }

    pub fn note_count(&self) -> usize {
        [&self.bass, &self.melody, &self.texture]
            .iter()
            .flat_map(|voice| voice.iter())
            .map(Vec::len)
            .sum()
    }

    /// Every voice needs exactly one note list per time signature, and every
    /// denominator must be a power of two.
    pub fn check_shape(&self) -> crate::Result<()> {
        if let Some(ts) = self.ts.iter().find(|ts| !ts.denominator.is_power_of_two()) {
            return Err(crate::Error::MalformedDataset(format!(
                "time signature {}/{} has no MIDI encoding",
                ts.numerator, ts.denominator
            )));
        }

        let expected = self.ts.len();
        for (name, voice) in [
            ("bass", &self.bass),
            ("melody", &self.melody),
            ("texture", &self.texture),
        ] {
            if voice.len() != expected {
                return Err(crate::Error::MalformedDataset(format!(
                    "{name} has {} segments for {expected} time signatures",
                    voice.len()
                )));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Segmenter plus classifier, configured once per run.
#[derive(Debug, Clone)]
pub struct Extractor {
    segmenter: Segmenter,
}

impl Extractor {
    pub fn new(bpm: f64, config: &ExtractConfig) -> Self {
        Self {
            segmenter: Segmenter::new(bpm, config),
        }
    }

    /// Validate, quantize, and classify every segment of `score`.
    ///
    /// Classifier state starts fresh for each call and runs through the
    /// segments in order.
    pub fn extract(&self, score: &TimedScore) -> crate::Result<VoiceDataset> {
        let segments = self.segmenter.segment(score)?;

        let mut dataset = VoiceDataset {
            ts: score.time_signatures.clone(),
            ..Default::default()
        };
        let mut state = VoiceState::default();

        for segment in &segments {
            let (split, next) = classify_segment(&segment.notes, state);
            if split.len() != segment.notes.len() {
                return Err(crate::Error::InvariantViolation(format!(
                    "classifier returned {} notes for a segment of {}",
                    split.len(),
                    segment.notes.len()
                )));
            }
            state = next;

            dataset.melody.push(split.melody);
            dataset.bass.push(split.bass);
            dataset.texture.push(split.texture);
        }

        if dataset.melody.len() != dataset.ts.len() {
            return Err(crate::Error::InvariantViolation(format!(
                "{} time signatures produced {} voice segments",
                dataset.ts.len(),
                dataset.melody.len()
            )));
        }

        debug!(
            segments = dataset.segment_count(),
            notes = dataset.note_count(),
            last_melody = state.last_melody,
            last_bass = state.last_bass,
            "extracted voices"
        );
        Ok(dataset)
    }
}
