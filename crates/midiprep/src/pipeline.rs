//! One-call entry points over MIDI bytes, built from a [`PrepConfig`].

use crate::decode::{decode, read_timed_score};
use crate::extract::{Extractor, VoiceDataset};
use crate::normalize::{NormalizedScore, Normalizer};
use crate::reconstruct::{reconstruct, ReconstructedScore};
use prepconf::PrepConfig;

#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(config: &PrepConfig) -> Self {
        Self {
            normalizer: Normalizer::new(&config.quantize),
            extractor: Extractor::new(config.quantize.bpm, &config.extract),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.normalizer.bpm()
    }

    /// Decode and rescale onto the fixed tempo.
    pub fn quantize(&self, midi_bytes: &[u8]) -> crate::Result<NormalizedScore> {
        let decoded = decode(midi_bytes)?;
        self.normalizer.normalize(&decoded)
    }

    /// [`quantize`](Self::quantize), encoded back to MIDI at the fixed tempo.
    pub fn quantize_to_midi(&self, midi_bytes: &[u8]) -> crate::Result<Vec<u8>> {
        let normalized = self.quantize(midi_bytes)?;
        Ok(normalized.score.to_midi(self.bpm()))
    }

    /// Normalize, then extract voices.
    pub fn extract(&self, midi_bytes: &[u8]) -> crate::Result<VoiceDataset> {
        let normalized = self.quantize(midi_bytes)?;
        self.extractor.extract(&normalized.score)
    }

    /// Extract voices from a file already on the fixed tempo.
    pub fn extract_normalized(&self, midi_bytes: &[u8]) -> crate::Result<VoiceDataset> {
        let score = read_timed_score(midi_bytes)?;
        self.extractor.extract(&score)
    }

    pub fn reconstruct(&self, dataset: &VoiceDataset) -> crate::Result<ReconstructedScore> {
        reconstruct(dataset, self.bpm())
    }
}
