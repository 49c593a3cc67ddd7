//! Note pairing, global tempo estimation, and rescaling onto a fixed tempo.

use crate::decode::{DecodedMidi, RawEvent};
use crate::note::{Key, KeySignatureChange, Note, TimeSignatureChange};
use crate::score::{TimedScore, TimedTrack};
use prepconf::QuantizeConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Slots 0..=129; only 0..=127 are reachable from decoded MIDI.
const PITCH_SLOTS: usize = 130;

/// Per-track pairing error counts. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingDiagnostics {
    /// Completed notes.
    pub notes: usize,
    /// Note-ons dropped because the pitch was already sounding.
    pub error_on: usize,
    /// Note-offs with no sounding note to close.
    pub error_off: usize,
}

impl PairingDiagnostics {
    pub fn has_errors(&self) -> bool {
        self.error_on > 0 || self.error_off > 0
    }
}

/// Notes of one track in absolute source ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedTrack {
    pub name: String,
    pub notes: Vec<Note<u64>>,
    pub diagnostics: PairingDiagnostics,
}

/// Pair note-on/note-off events of one track.
///
/// A note-on for a pitch that is already sounding is dropped (the earlier
/// note keeps sounding). Notes still open at the end of the track are lost.
pub fn pair_track(events: &[RawEvent]) -> PairedTrack {
    let mut open: [Option<(u64, u8)>; PITCH_SLOTS] = [None; PITCH_SLOTS];
    let mut notes = Vec::new();
    let mut diagnostics = PairingDiagnostics::default();
    let mut name = String::new();
    let mut tick: u64 = 0;

    for event in events {
        tick += event.delta() as u64;
        match *event {
            RawEvent::NoteOn {
                pitch, velocity, ..
            } if velocity > 0 => {
                let Some(slot) = open.get_mut(pitch as usize) else {
                    continue;
                };
                if slot.is_none() {
                    *slot = Some((tick, velocity));
                } else {
                    diagnostics.error_on += 1;
                }
            }
            RawEvent::NoteOn { pitch, .. } | RawEvent::NoteOff { pitch, .. } => {
                match open.get_mut(pitch as usize).and_then(Option::take) {
                    Some((onset, velocity)) => {
                        notes.push(Note::new(pitch, onset, tick, velocity));
                    }
                    None => diagnostics.error_off += 1,
                }
            }
            RawEvent::TrackName { name: ref n, .. } => name = n.clone(),
            _ => {}
        }
    }

    diagnostics.notes = notes.len();
    PairedTrack {
        name,
        notes,
        diagnostics,
    }
}

/// Which global correction was applied to the beat time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoCorrection {
    None,
    Doubled,
    Halved,
    /// Only reachable with overlapping thresholds.
    DoubledThenHalved,
}

/// Global tempo estimate for one file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Arithmetic mean of the accepted tempo events, in µs per beat.
    pub mean_usec_per_beat: f64,
    /// Number of tempo events that passed the bpm filter.
    pub accepted_events: usize,
}

impl TempoEstimate {
    pub fn bpm(&self) -> f64 {
        usec_to_bpm(self.mean_usec_per_beat)
    }
}

fn usec_to_bpm(usec_per_beat: f64) -> f64 {
    60_000_000.0 / usec_per_beat
}

/// Result of normalizing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedScore {
    pub score: TimedScore,
    pub tempo: TempoEstimate,
    pub correction: TempoCorrection,
    /// Seconds per beat actually used for rescaling.
    pub beat_time: f64,
}

/// Rescales a performance onto a single fixed tempo.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: QuantizeConfig,
}

impl Normalizer {
    pub fn new(config: &QuantizeConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn bpm(&self) -> f64 {
        self.config.bpm
    }

    /// Mean of all tempo events below the configured ceiling.
    pub fn estimate_tempo(&self, decoded: &DecodedMidi) -> crate::Result<TempoEstimate> {
        let accepted: Vec<f64> = decoded
            .tracks
            .iter()
            .flatten()
            .filter_map(|event| match *event {
                RawEvent::Tempo { usec_per_beat, .. } => Some(usec_per_beat as f64),
                _ => None,
            })
            .filter(|&usec| usec_to_bpm(usec) < self.config.max_tempo_bpm)
            .collect();

        if accepted.is_empty() {
            return Err(crate::Error::NoTempoFound {
                max_bpm: self.config.max_tempo_bpm,
            });
        }

        Ok(TempoEstimate {
            mean_usec_per_beat: accepted.iter().sum::<f64>() / accepted.len() as f64,
            accepted_events: accepted.len(),
        })
    }

    /// Seconds per output beat after the slow/fast correction for `mean_bpm`.
    pub fn corrected_beat_time(&self, mean_bpm: f64) -> (f64, TempoCorrection) {
        let [slow, fast] = self.config.tempo_thresholds;
        let mut beat_time = self.config.beat_time();
        let doubled = mean_bpm <= slow;
        let halved = mean_bpm >= fast;
        if doubled {
            beat_time *= 2.0;
        }
        if halved {
            beat_time /= 2.0;
        }
        let correction = match (doubled, halved) {
            (false, false) => TempoCorrection::None,
            (true, false) => TempoCorrection::Doubled,
            (false, true) => TempoCorrection::Halved,
            (true, true) => TempoCorrection::DoubledThenHalved,
        };
        (beat_time, correction)
    }

    pub fn normalize(&self, decoded: &DecodedMidi) -> crate::Result<NormalizedScore> {
        let tpb = decoded.ticks_per_beat as f64;

        let mut time_signatures: Vec<(u64, u8, u8)> = Vec::new();
        let mut key_signatures: Vec<(u64, Key)> = Vec::new();
        let mut paired = Vec::new();

        for (track_index, events) in decoded.tracks.iter().enumerate() {
            let mut tick: u64 = 0;
            for event in events {
                tick += event.delta() as u64;
                match *event {
                    RawEvent::TimeSignature {
                        numerator,
                        denominator,
                        ..
                    } => time_signatures.push((tick, numerator, denominator)),
                    RawEvent::KeySignature { key, .. } => key_signatures.push((tick, key)),
                    _ => {}
                }
            }

            let track = pair_track(events);
            if track.notes.is_empty() {
                continue;
            }
            if track.diagnostics.has_errors() {
                warn!(
                    track = track_index,
                    error_on = track.diagnostics.error_on,
                    error_off = track.diagnostics.error_off,
                    "unbalanced note events"
                );
            }
            debug!(
                track = track_index,
                notes = track.diagnostics.notes,
                "paired track"
            );
            paired.push(track);
        }

        let tempo = self.estimate_tempo(decoded)?;
        let (beat_time, correction) = self.corrected_beat_time(tempo.bpm());
        debug!(
            mean_bpm = tempo.bpm(),
            ?correction,
            beat_time,
            "estimated tempo"
        );

        let to_seconds = |tick: u64| tick as f64 / tpb * beat_time;

        time_signatures.sort_by_key(|(tick, _, _)| *tick);
        key_signatures.sort_by_key(|(tick, _)| *tick);

        let tracks = paired
            .into_iter()
            .enumerate()
            .map(|(i, track)| TimedTrack {
                name: if track.name.is_empty() {
                    format!("Piano_{i}")
                } else {
                    track.name
                },
                notes: track
                    .notes
                    .into_iter()
                    .map(|n| n.map_time(to_seconds))
                    .collect(),
                diagnostics: track.diagnostics,
            })
            .collect();

        let score = TimedScore {
            tracks,
            time_signatures: time_signatures
                .into_iter()
                .map(|(tick, numerator, denominator)| TimeSignatureChange {
                    numerator,
                    denominator,
                    time: to_seconds(tick),
                })
                .collect(),
            key_signatures: key_signatures
                .into_iter()
                .map(|(tick, key)| KeySignatureChange {
                    key,
                    time: to_seconds(tick),
                })
                .collect(),
        };

        Ok(NormalizedScore {
            score,
            tempo,
            correction,
            beat_time,
        })
    }
}
