//! Time-signature-aware quantization of normalized notes into tick units.

use crate::note::{Note, TimeSignatureChange};
use crate::score::TimedScore;
use prepconf::ExtractConfig;
use tracing::debug;

/// Ticks per beat of the segment's denominator.
pub const TICKS_PER_BEAT: i64 = 12;

/// Seconds per tick for a segment: `(60 / bpm) / 12 * (4 / denominator)`.
pub fn tick_unit(bpm: f64, denominator: u8) -> f64 {
    60.0 / bpm / TICKS_PER_BEAT as f64 * 4.0 / denominator as f64
}

/// Round seconds to the nearest tick, halves to even.
pub fn to_tick(seconds: f64, unit: f64) -> i64 {
    (seconds / unit).round_ties_even() as i64
}

/// Pull onsets one tick off the beat grid onto it, moving the end along.
///
/// An onset one past a beat moves back (never before `segment_start`);
/// otherwise an onset one before a beat moves forward.
pub fn snap_onset(start: i64, end: i64, segment_start: i64) -> (i64, i64) {
    if start > segment_start && (start - 1).rem_euclid(TICKS_PER_BEAT) == 0 {
        (start - 1, end - 1)
    } else if (start + 1).rem_euclid(TICKS_PER_BEAT) == 0 {
        (start + 1, end + 1)
    } else {
        (start, end)
    }
}

/// Notes governed by one time signature, in that segment's tick units.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub time_signature: TimeSignatureChange,
    /// Seconds per tick.
    pub tick_unit: f64,
    /// First tick of the segment.
    pub start_tick: i64,
    /// First tick of the next segment; `None` for the last one.
    pub end_tick: Option<i64>,
    /// Sorted by `(start, pitch)`.
    pub notes: Vec<Note<i64>>,
}

/// Validates, merges, and quantizes a normalized score.
#[derive(Debug, Clone)]
pub struct Segmenter {
    bpm: f64,
    config: ExtractConfig,
}

impl Segmenter {
    pub fn new(bpm: f64, config: &ExtractConfig) -> Self {
        Self {
            bpm,
            config: config.clone(),
        }
    }

    /// Reject scores outside the pitch bounds or with unsupported meters.
    pub fn validate(&self, score: &TimedScore) -> crate::Result<()> {
        let [low, high] = self.config.pitch_bounds;
        for track in &score.tracks {
            if let Some((min, max)) = track.pitch_range() {
                if min < low || max > high {
                    return Err(crate::Error::PitchRangeViolation {
                        track: track.name.clone(),
                        min,
                        max,
                        low,
                        high,
                    });
                }
            }
        }

        if let Some(ts) = score
            .time_signatures
            .iter()
            .find(|ts| !self.config.allows_denominator(ts.denominator))
        {
            return Err(crate::Error::UnsupportedDenominator {
                denominator: ts.denominator,
            });
        }

        Ok(())
    }

    /// All tracks' notes in one list ordered by `(start, pitch)`.
    pub fn merge(score: &TimedScore) -> Vec<Note<f64>> {
        let mut merged: Vec<Note<f64>> = score
            .tracks
            .iter()
            .flat_map(|t| t.notes.iter().copied())
            .collect();
        merged.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
        merged
    }

    /// Validate, merge, and quantize.
    pub fn segment(&self, score: &TimedScore) -> crate::Result<Vec<Segment>> {
        self.validate(score)?;
        let merged = Self::merge(score);
        self.quantize(&merged, &score.time_signatures)
    }

    /// Walk the time-ordered `notes` once, handing each to the segment its
    /// quantized onset falls in.
    ///
    /// A non-final segment stops at the first note whose onset is past its
    /// end; the final segment takes everything left.
    pub fn quantize(
        &self,
        notes: &[Note<f64>],
        time_signatures: &[TimeSignatureChange],
    ) -> crate::Result<Vec<Segment>> {
        let mut segments = Vec::with_capacity(time_signatures.len());
        let mut cursor = 0;

        for (i, ts) in time_signatures.iter().enumerate() {
            let unit = tick_unit(self.bpm, ts.denominator);
            let start_tick = to_tick(ts.time, unit);
            let end_tick = time_signatures.get(i + 1).map(|next| to_tick(next.time, unit));

            let mut segment_notes = Vec::new();
            while let Some(note) = notes.get(cursor) {
                let start = to_tick(note.start, unit).max(start_tick);
                let mut end = to_tick(note.end, unit);
                if let Some(boundary) = end_tick {
                    end = end.min(boundary);
                }
                let (start, end) = snap_onset(start, end, start_tick);

                if let Some(boundary) = end_tick {
                    if !(start_tick..boundary).contains(&start) {
                        break;
                    }
                }

                segment_notes.push(Note::new(note.pitch, start, end, note.velocity));
                cursor += 1;
            }

            segment_notes.sort_by_key(|n| (n.start, n.pitch));
            debug!(
                segment = i,
                numerator = ts.numerator,
                denominator = ts.denominator,
                notes = segment_notes.len(),
                "quantized segment"
            );

            segments.push(Segment {
                time_signature: *ts,
                tick_unit: unit,
                start_tick,
                end_tick,
                notes: segment_notes,
            });
        }

        if segments.len() != time_signatures.len() {
            return Err(crate::Error::InvariantViolation(format!(
                "{} time signatures produced {} segments",
                time_signatures.len(),
                segments.len()
            )));
        }

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::PairingDiagnostics;
    use crate::score::TimedTrack;
    use pretty_assertions::assert_eq;

    fn ts(numerator: u8, denominator: u8, time: f64) -> TimeSignatureChange {
        TimeSignatureChange {
            numerator,
            denominator,
            time,
        }
    }

    fn track(name: &str, notes: Vec<Note<f64>>) -> TimedTrack {
        TimedTrack {
            name: name.to_string(),
            notes,
            diagnostics: PairingDiagnostics::default(),
        }
    }

    fn segmenter() -> Segmenter {
        Segmenter::new(120.0, &ExtractConfig::default())
    }

    #[test]
    fn tick_unit_shrinks_with_denominator() {
        let half = tick_unit(120.0, 2);
        let quarter = tick_unit(120.0, 4);
        let eighth = tick_unit(120.0, 8);
        assert!(half > quarter && quarter > eighth);
        assert!((quarter - 0.5 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn rounding_is_half_to_even() {
        assert_eq!(to_tick(2.5, 1.0), 2);
        assert_eq!(to_tick(3.5, 1.0), 4);
        assert_eq!(to_tick(2.4, 1.0), 2);
    }

    #[test]
    fn snap_rules() {
        // One past the beat moves back.
        assert_eq!(snap_onset(13, 20, 0), (12, 19));
        // One before the beat moves forward.
        assert_eq!(snap_onset(11, 20, 0), (12, 21));
        // A segment's first tick is never pulled back.
        assert_eq!(snap_onset(13, 20, 13), (13, 20));
        // Off-grid but not adjacent: untouched.
        assert_eq!(snap_onset(6, 9, 0), (6, 9));
        // Tick 1 snaps back to 0 only when 0 is inside the segment.
        assert_eq!(snap_onset(1, 5, 0), (0, 4));
    }

    #[test]
    fn snap_is_idempotent() {
        for segment_start in [0i64, 5, 13, 24] {
            for start in segment_start..segment_start + 60 {
                let once = snap_onset(start, start + 6, segment_start);
                let twice = snap_onset(once.0, once.1, segment_start);
                assert_eq!(once, twice, "start {start}, segment {segment_start}");
            }
        }
    }

    #[test]
    fn merge_orders_by_start_then_pitch() {
        let score = TimedScore {
            tracks: vec![
                track("a", vec![Note::new(72, 0.0, 1.0, 90), Note::new(60, 1.0, 2.0, 90)]),
                track("b", vec![Note::new(48, 0.0, 1.0, 90), Note::new(50, 0.5, 1.0, 90)]),
            ],
            ..Default::default()
        };
        let pitches: Vec<u8> = Segmenter::merge(&score).iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![48, 72, 50, 60]);
    }

    #[test]
    fn pitch_out_of_range_rejected() {
        let score = TimedScore {
            tracks: vec![track("low", vec![Note::new(20, 0.0, 1.0, 90)])],
            time_signatures: vec![ts(4, 4, 0.0)],
            ..Default::default()
        };
        let err = segmenter().segment(&score).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::PitchRangeViolation { min: 20, max: 20, .. }
        ));
    }

    #[test]
    fn unsupported_denominator_rejected() {
        let score = TimedScore {
            tracks: vec![track("t", vec![Note::new(60, 0.0, 1.0, 90)])],
            time_signatures: vec![ts(4, 4, 0.0), ts(7, 16, 2.0)],
            ..Default::default()
        };
        let err = segmenter().segment(&score).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::UnsupportedDenominator { denominator: 16 }
        ));
    }

    #[test]
    fn quantizes_single_segment() {
        // 120 bpm, 4/4: one tick = 1/24 s.
        let unit = tick_unit(120.0, 4);
        let notes = vec![
            Note::new(60, 0.0, 0.5, 90),
            Note::new(64, 12.0 * unit, 24.0 * unit, 90),
            // Lands on tick 25, snaps back to 24.
            Note::new(67, 25.0 * unit, 36.0 * unit, 90),
            // Lands on tick 35, snaps forward to 36.
            Note::new(69, 35.0 * unit, 48.0 * unit, 90),
        ];
        let segments = segmenter().quantize(&notes, &[ts(4, 4, 0.0)]).unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].end_tick, None);
        assert_eq!(
            segments[0].notes,
            vec![
                Note::new(60, 0, 12, 90),
                Note::new(64, 12, 24, 90),
                Note::new(67, 24, 35, 90),
                Note::new(69, 36, 49, 90),
            ]
        );
    }

    #[test]
    fn boundaries_clamp_and_split() {
        // 2/4 for one second (24 ticks at 4/4 units), then 6/8.
        let changes = [ts(2, 4, 0.0), ts(6, 8, 1.0)];
        let notes = vec![
            // Crosses the boundary: end clamps to tick 24.
            Note::new(60, 0.5, 1.5, 90),
            // Starts in the second segment: eighth-note ticks of 1/48 s.
            Note::new(62, 1.25, 1.5, 90),
        ];
        let segments = segmenter().quantize(&notes, &changes).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_tick, 0);
        assert_eq!(segments[0].end_tick, Some(24));
        assert_eq!(segments[0].notes, vec![Note::new(60, 12, 24, 90)]);

        assert_eq!(segments[1].start_tick, 48);
        assert_eq!(segments[1].end_tick, None);
        assert_eq!(segments[1].notes, vec![Note::new(62, 60, 72, 90)]);
    }

    #[test]
    fn early_note_clamps_to_segment_start() {
        // A note starting before the first time signature is pulled onto it.
        let notes = vec![Note::new(60, 0.0, 2.0, 90)];
        let segments = segmenter().quantize(&notes, &[ts(4, 4, 0.5)]).unwrap();
        assert_eq!(segments[0].start_tick, 12);
        assert_eq!(segments[0].notes, vec![Note::new(60, 12, 48, 90)]);
    }

    #[test]
    fn no_time_signatures_means_no_segments() {
        let notes = vec![Note::new(60, 0.0, 1.0, 90)];
        let segments = segmenter().quantize(&notes, &[]).unwrap();
        assert!(segments.is_empty());
    }
}
