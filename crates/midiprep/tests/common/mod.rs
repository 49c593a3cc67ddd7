//! Builders for synthetic MIDI files used across integration tests.

#![allow(dead_code)]

/// `(pitch, start_tick, end_tick, velocity)`
pub type NoteSpec = (u8, u32, u32, u8);

/// Format-1 file builder: a conductor track plus note tracks.
#[derive(Debug, Clone)]
pub struct TestMidi {
    ppq: u16,
    conductor: Vec<(u32, Vec<u8>)>,
    tracks: Vec<Vec<(u32, Vec<u8>)>>,
}

impl TestMidi {
    pub fn new(ppq: u16) -> Self {
        Self {
            ppq,
            conductor: Vec::new(),
            tracks: Vec::new(),
        }
    }

    pub fn tempo(mut self, tick: u32, bpm: f64) -> Self {
        let usec = (60_000_000.0 / bpm).round() as u32;
        self.conductor.push((
            tick,
            vec![0xFF, 0x51, 0x03, (usec >> 16) as u8, (usec >> 8) as u8, usec as u8],
        ));
        self
    }

    pub fn time_signature(mut self, tick: u32, numerator: u8, denominator: u8) -> Self {
        let pow = denominator.trailing_zeros() as u8;
        self.conductor
            .push((tick, vec![0xFF, 0x58, 0x04, numerator, pow, 0x18, 0x08]));
        self
    }

    pub fn key_signature(mut self, tick: u32, sharps: i8, minor: bool) -> Self {
        self.conductor
            .push((tick, vec![0xFF, 0x59, 0x02, sharps as u8, minor as u8]));
        self
    }

    pub fn track(mut self, name: &str, notes: &[NoteSpec]) -> Self {
        let mut events = vec![(0, {
            let mut e = vec![0xFF, 0x03, name.len() as u8];
            e.extend_from_slice(name.as_bytes());
            e
        })];
        for &(pitch, start, end, velocity) in notes {
            events.push((start, vec![0x90, pitch, velocity]));
            events.push((end, vec![0x80, pitch, 0]));
        }
        events.sort_by_key(|(tick, data)| (*tick, data[0] == 0x90));
        self.tracks.push(events);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut conductor = self.conductor.clone();
        conductor.sort_by_key(|(tick, _)| *tick);

        let mut chunks = vec![encode(&conductor)];
        chunks.extend(self.tracks.iter().map(|t| encode(t)));

        let mut buf = Vec::new();
        buf.extend_from_slice(b"MThd");
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&1u16.to_be_bytes());
        buf.extend_from_slice(&(chunks.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.ppq.to_be_bytes());
        for chunk in chunks {
            buf.extend_from_slice(b"MTrk");
            buf.extend_from_slice(&(chunk.len() as u32).to_be_bytes());
            buf.extend_from_slice(&chunk);
        }
        buf
    }
}

fn encode(events: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut last = 0;
    for (tick, data) in events {
        write_vlq(&mut out, tick - last);
        out.extend_from_slice(data);
        last = *tick;
    }
    out.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    out
}

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

/// A two-hand piano phrase at `bpm`, 480 ppq, in 4/4 then 3/4 from bar 3.
///
/// Every event sits on a multiple of 40 ticks, one quantized tick at 4/4.
pub fn piano_phrase(bpm: f64) -> Vec<u8> {
    let right: Vec<NoteSpec> = vec![
        (72, 0, 480, 100),
        (76, 480, 960, 96),
        (79, 960, 1200, 92),
        (77, 1200, 1440, 90),
        (76, 1440, 1920, 94),
        (74, 1920, 2880, 88),
        (72, 2880, 3360, 100),
        (71, 3360, 3840, 90),
        (72, 3840, 4320, 96),
        (74, 4320, 4800, 90),
        (76, 4800, 5280, 92),
    ];
    let left: Vec<NoteSpec> = vec![
        (48, 0, 960, 80),
        (55, 0, 960, 70),
        (64, 0, 960, 70),
        (43, 960, 1920, 80),
        (59, 960, 1920, 70),
        (45, 1920, 3840, 80),
        (52, 1960, 3840, 70),
        (48, 3840, 5280, 80),
        (55, 3840, 5280, 70),
    ];

    TestMidi::new(480)
        .tempo(0, bpm)
        .time_signature(0, 4, 4)
        .time_signature(3840, 3, 4)
        .key_signature(0, 0, false)
        .track("Right", &right)
        .track("Left", &left)
        .build()
}

/// Total notes in [`piano_phrase`].
pub const PIANO_PHRASE_NOTES: usize = 20;
