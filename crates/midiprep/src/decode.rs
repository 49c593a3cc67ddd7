//! MIDI file decoding into per-track raw event streams.

use crate::normalize::{pair_track, PairingDiagnostics};
use crate::note::{Key, KeySignatureChange, Note, TimeSignatureChange};
use crate::score::{TimedScore, TimedTrack};
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

/// Ticks per beat assumed for SMPTE-timed files.
pub const FALLBACK_TICKS_PER_BEAT: u16 = 480;

/// Microseconds per beat before the first tempo event (120 bpm).
pub const DEFAULT_TEMPO_USEC: u32 = 500_000;

/// One decoded track event. `delta` is in ticks since the previous event.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    NoteOn { pitch: u8, velocity: u8, delta: u32 },
    NoteOff { pitch: u8, delta: u32 },
    Tempo { usec_per_beat: u32, delta: u32 },
    TimeSignature { numerator: u8, denominator: u8, delta: u32 },
    KeySignature { key: Key, delta: u32 },
    TrackName { name: String, delta: u32 },
    /// Anything else; kept so deltas still accumulate.
    Other { delta: u32 },
}

impl RawEvent {
    pub fn delta(&self) -> u32 {
        match self {
            Self::NoteOn { delta, .. }
            | Self::NoteOff { delta, .. }
            | Self::Tempo { delta, .. }
            | Self::TimeSignature { delta, .. }
            | Self::KeySignature { delta, .. }
            | Self::TrackName { delta, .. }
            | Self::Other { delta } => *delta,
        }
    }
}

/// Decoded file: resolution plus one raw event list per track.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMidi {
    pub ticks_per_beat: u16,
    pub tracks: Vec<Vec<RawEvent>>,
}

/// Parse SMF bytes with midly and flatten them into [`RawEvent`]s.
pub fn decode(midi_bytes: &[u8]) -> crate::Result<DecodedMidi> {
    let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;

    let ticks_per_beat = match smf.header.timing {
        midly::Timing::Metrical(ticks) => ticks.as_int(),
        midly::Timing::Timecode(_, _) => FALLBACK_TICKS_PER_BEAT,
    };
    if ticks_per_beat == 0 {
        return Err(crate::Error::MidiParse(
            "header declares zero ticks per beat".to_string(),
        ));
    }

    let tracks = smf
        .tracks
        .iter()
        .map(|track| track.iter().map(convert_event).collect())
        .collect::<crate::Result<Vec<Vec<RawEvent>>>>()?;

    Ok(DecodedMidi {
        ticks_per_beat,
        tracks,
    })
}

fn convert_event(event: &midly::TrackEvent) -> crate::Result<RawEvent> {
    let delta = event.delta.as_int();
    let raw = match event.kind {
        TrackEventKind::Midi { message, .. } => match message {
            MidiMessage::NoteOn { key, vel } => RawEvent::NoteOn {
                pitch: key.as_int(),
                velocity: vel.as_int(),
                delta,
            },
            MidiMessage::NoteOff { key, .. } => RawEvent::NoteOff {
                pitch: key.as_int(),
                delta,
            },
            _ => RawEvent::Other { delta },
        },
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => RawEvent::Tempo {
            usec_per_beat: tempo.as_int(),
            delta,
        },
        TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, denom_pow, _, _)) => {
            let denominator = 1u8.checked_shl(denom_pow as u32).ok_or_else(|| {
                crate::Error::MidiParse(format!(
                    "time signature denominator 2^{denom_pow} is out of range"
                ))
            })?;
            RawEvent::TimeSignature {
                numerator,
                denominator,
                delta,
            }
        }
        TrackEventKind::Meta(MetaMessage::KeySignature(sharps, minor)) => {
            RawEvent::KeySignature {
                key: Key::from_sharps(sharps, minor),
                delta,
            }
        }
        TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => RawEvent::TrackName {
            name: String::from_utf8_lossy(bytes).into_owned(),
            delta,
        },
        _ => RawEvent::Other { delta },
    };
    Ok(raw)
}

/// Piecewise-constant tempo map for converting ticks to seconds.
#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_beat: f64,
    /// `(tick, seconds_at_tick, usec_per_beat)`, sorted by tick.
    segments: Vec<(u64, f64, u32)>,
}

impl TempoMap {
    /// Build from absolute-tick tempo events. Later events at the same tick win.
    pub fn new(ticks_per_beat: u16, mut changes: Vec<(u64, u32)>) -> Self {
        changes.sort_by_key(|(tick, _)| *tick);

        let tpb = ticks_per_beat as f64;
        let mut segments: Vec<(u64, f64, u32)> = vec![(0, 0.0, DEFAULT_TEMPO_USEC)];
        for (tick, usec) in changes {
            let (last_tick, last_secs, last_usec) = segments[segments.len() - 1];
            if tick == last_tick {
                let idx = segments.len() - 1;
                segments[idx].2 = usec;
                continue;
            }
            let secs = last_secs + (tick - last_tick) as f64 / tpb * last_usec as f64 / 1e6;
            segments.push((tick, secs, usec));
        }

        Self {
            ticks_per_beat: tpb,
            segments,
        }
    }

    pub fn seconds_at(&self, tick: u64) -> f64 {
        let idx = self
            .segments
            .partition_point(|(start, _, _)| *start <= tick)
            .saturating_sub(1);
        let (start, secs, usec) = self.segments[idx];
        secs + (tick - start) as f64 / self.ticks_per_beat * usec as f64 / 1e6
    }
}

/// Load a file that is already on a normalized timeline, honoring its own
/// tempo map, into the segmenter's input form.
pub fn read_timed_score(midi_bytes: &[u8]) -> crate::Result<TimedScore> {
    let decoded = decode(midi_bytes)?;

    let mut tempo_changes = Vec::new();
    let mut time_signatures = Vec::new();
    let mut key_signatures = Vec::new();
    let mut paired: Vec<(String, Vec<Note<u64>>, PairingDiagnostics)> = Vec::new();

    for events in &decoded.tracks {
        let mut tick: u64 = 0;
        for event in events {
            tick += event.delta() as u64;
            match event {
                RawEvent::Tempo { usec_per_beat, .. } => tempo_changes.push((tick, *usec_per_beat)),
                RawEvent::TimeSignature {
                    numerator,
                    denominator,
                    ..
                } => time_signatures.push((tick, *numerator, *denominator)),
                RawEvent::KeySignature { key, .. } => key_signatures.push((tick, *key)),
                _ => {}
            }
        }

        let track = pair_track(events);
        if !track.notes.is_empty() {
            paired.push((track.name, track.notes, track.diagnostics));
        }
    }

    let tempo_map = TempoMap::new(decoded.ticks_per_beat, tempo_changes);
    time_signatures.sort_by_key(|(tick, _, _)| *tick);
    key_signatures.sort_by_key(|(tick, _)| *tick);

    let tracks = paired
        .into_iter()
        .enumerate()
        .map(|(i, (name, notes, diagnostics))| TimedTrack {
            name: if name.is_empty() {
                format!("Piano_{i}")
            } else {
                name
            },
            notes: notes
                .into_iter()
                .map(|n| n.map_time(|t| tempo_map.seconds_at(t)))
                .collect(),
            diagnostics,
        })
        .collect();

    Ok(TimedScore {
        tracks,
        time_signatures: time_signatures
            .into_iter()
            .map(|(tick, numerator, denominator)| TimeSignatureChange {
                numerator,
                denominator,
                time: tempo_map.seconds_at(tick),
            })
            .collect(),
        key_signatures: key_signatures
            .into_iter()
            .map(|(tick, key)| KeySignatureChange {
                key,
                time: tempo_map.seconds_at(tick),
            })
            .collect(),
    })
}
