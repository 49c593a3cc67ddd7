use crate::note::{KeySignatureChange, Note, TimeSignatureChange};

/// Resolution of every file this crate writes.
pub const OUTPUT_PPQ: u16 = 480;

/// Conductor-track contents shared by every note track.
#[derive(Debug, Clone, Copy)]
pub struct TrackLayout<'a> {
    pub bpm: f64,
    pub time_signatures: &'a [TimeSignatureChange],
    pub key_signatures: &'a [KeySignatureChange],
}

/// A named list of notes in seconds.
#[derive(Debug, Clone, Copy)]
pub struct NoteTrack<'a> {
    pub name: &'a str,
    pub notes: &'a [Note<f64>],
}

/// Convert seconds on a constant-tempo timeline to output ticks.
pub fn seconds_to_ticks(seconds: f64, bpm: f64) -> u64 {
    (seconds * bpm / 60.0 * OUTPUT_PPQ as f64).round().max(0.0) as u64
}

/// Write note tracks to Standard MIDI File format 1 bytes.
///
/// Track 0: tempo, time signatures, key signatures.
/// Tracks 1+: one per note track, with track name, program change, note events.
pub fn write_smf(layout: &TrackLayout<'_>, note_tracks: &[NoteTrack<'_>]) -> Vec<u8> {
    let mut tracks: Vec<Vec<u8>> = Vec::with_capacity(note_tracks.len() + 1);
    tracks.push(build_conductor_track(layout));

    // Assign channels, skipping 9 (drums)
    for (index, track) in note_tracks.iter().enumerate() {
        let channel = match index {
            0..=8 => index as u8,
            _ => (index.min(14) + 1) as u8,
        };
        tracks.push(build_note_track(track, channel, layout.bpm));
    }

    build_midi_file(OUTPUT_PPQ, &tracks)
}

fn build_conductor_track(layout: &TrackLayout<'_>) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    let usec = (60_000_000.0 / layout.bpm).round() as u32;
    events.push((
        0,
        vec![
            0xFF,
            0x51,
            0x03,
            (usec >> 16) as u8,
            (usec >> 8) as u8,
            usec as u8,
        ],
    ));

    for ts in layout.time_signatures {
        let denom_pow = ts.denominator.max(1).trailing_zeros() as u8;
        events.push((
            seconds_to_ticks(ts.time, layout.bpm),
            vec![0xFF, 0x58, 0x04, ts.numerator, denom_pow, 0x18, 0x08],
        ));
    }

    for ks in layout.key_signatures {
        let (sharps, minor) = ks.key.to_sharps();
        events.push((
            seconds_to_ticks(ks.time, layout.bpm),
            vec![0xFF, 0x59, 0x02, sharps as u8, minor as u8],
        ));
    }

    events.sort_by_key(|(tick, _)| *tick);
    encode_events(events)
}

fn build_note_track(track: &NoteTrack<'_>, channel: u8, bpm: f64) -> Vec<u8> {
    let mut events: Vec<(u64, Vec<u8>)> = Vec::new();

    let name_bytes = track.name.as_bytes();
    let mut name_event = vec![0xFF, 0x03];
    write_vlq(&mut name_event, name_bytes.len() as u32);
    name_event.extend_from_slice(name_bytes);
    events.push((0, name_event));

    events.push((0, vec![0xC0 | (channel & 0x0F), 0]));

    for note in track.notes {
        let pitch = note.pitch & 0x7F;
        events.push((
            seconds_to_ticks(note.start, bpm),
            vec![0x90 | (channel & 0x0F), pitch, note.velocity & 0x7F],
        ));
        events.push((
            seconds_to_ticks(note.end, bpm),
            vec![0x80 | (channel & 0x0F), pitch, 0],
        ));
    }

    // Stable sort: meta first at tick 0, then note-offs before note-ons per tick
    events.sort_by(|a, b| {
        a.0.cmp(&b.0).then_with(|| {
            let a_is_off = a.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            let b_is_off = b.1.first().is_some_and(|b| b & 0xF0 == 0x80);
            b_is_off.cmp(&a_is_off)
        })
    });

    encode_events(events)
}

/// Absolute-tick events to delta-timed track bytes, with end-of-track.
fn encode_events(events: Vec<(u64, Vec<u8>)>) -> Vec<u8> {
    let mut track_data = Vec::new();
    let mut last_tick = 0u64;

    for (tick, data) in events {
        let delta = tick.saturating_sub(last_tick);
        write_vlq(&mut track_data, delta.min(0x0FFF_FFFF) as u32);
        track_data.extend_from_slice(&data);
        last_tick = tick;
    }

    write_vlq(&mut track_data, 0);
    track_data.extend_from_slice(&[0xFF, 0x2F, 0x00]);

    track_data
}

/// Header chunk followed by one `MTrk` chunk per encoded track.
fn build_midi_file(ppq: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes()); // format 1
    buf.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    buf.extend_from_slice(&ppq.to_be_bytes());

    for track_data in tracks {
        buf.extend_from_slice(b"MTrk");
        buf.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        buf.extend_from_slice(track_data);
    }

    buf
}

/// Big-endian base-128, high bit set on every byte but the last.
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;

    while value > 0 {
        bytes.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }

    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Key;
    use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

    fn layout<'a>(ts: &'a [TimeSignatureChange], ks: &'a [KeySignatureChange]) -> TrackLayout<'a> {
        TrackLayout {
            bpm: 120.0,
            time_signatures: ts,
            key_signatures: ks,
        }
    }

    #[test]
    fn output_parses_with_midly() {
        let ts = [TimeSignatureChange {
            numerator: 3,
            denominator: 4,
            time: 0.0,
        }];
        let ks = [KeySignatureChange {
            key: Key(7),
            time: 0.0,
        }];
        let notes = [Note::new(60, 0.0, 0.5, 100), Note::new(64, 0.5, 1.0, 80)];
        let bytes = write_smf(
            &layout(&ts, &ks),
            &[NoteTrack {
                name: "Melody",
                notes: &notes,
            }],
        );

        let smf = Smf::parse(&bytes).expect("Generated MIDI should be valid");
        assert_eq!(smf.header.format, midly::Format::Parallel);
        assert_eq!(smf.tracks.len(), 2);

        let metas: Vec<_> = smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Meta(m) => Some(m),
                _ => None,
            })
            .collect();
        assert!(metas
            .iter()
            .any(|m| matches!(m, MetaMessage::Tempo(t) if t.as_int() == 500_000)));
        assert!(metas
            .iter()
            .any(|m| matches!(m, MetaMessage::TimeSignature(3, 2, _, _))));
        assert!(metas
            .iter()
            .any(|m| matches!(m, MetaMessage::KeySignature(1, false))));

        let note_ons = smf.tracks[1]
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    TrackEventKind::Midi {
                        message: MidiMessage::NoteOn { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(note_ons, 2);
    }

    #[test]
    fn note_off_precedes_note_on_at_same_tick() {
        let notes = [Note::new(60, 0.0, 0.5, 100), Note::new(60, 0.5, 1.0, 100)];
        let bytes = write_smf(
            &layout(&[], &[]),
            &[NoteTrack {
                name: "Repeat",
                notes: &notes,
            }],
        );
        let smf = Smf::parse(&bytes).unwrap();
        let kinds: Vec<&str> = smf.tracks[1]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { .. } => Some("on"),
                    MidiMessage::NoteOff { .. } => Some("off"),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["on", "off", "on", "off"]);
    }

    #[test]
    fn seconds_to_ticks_at_tempo() {
        assert_eq!(seconds_to_ticks(0.5, 120.0), 480);
        assert_eq!(seconds_to_ticks(1.0, 60.0), 480);
        assert_eq!(seconds_to_ticks(-0.1, 120.0), 0);
    }

    #[test]
    fn vlq_byte_boundaries() {
        let cases: [(u32, &[u8]); 5] = [
            (0, &[0x00]),
            (0x7F, &[0x7F]),
            (0x80, &[0x81, 0x00]),
            (0x3FFF, &[0xFF, 0x7F]),
            (0x4000, &[0x81, 0x80, 0x00]),
        ];
        for (value, expected) in cases {
            let mut encoded = Vec::new();
            write_vlq(&mut encoded, value);
            assert_eq!(encoded, expected, "value {value:#x}");
        }
    }
}
