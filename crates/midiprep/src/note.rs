use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A paired note. `T` is seconds (`f64`) after normalization and
/// integer ticks (`i64`) after segmentation.
///
/// Serializes as `[pitch, start, end, velocity]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note<T> {
    pub pitch: u8,
    pub start: T,
    pub end: T,
    pub velocity: u8,
}

impl<T> Note<T> {
    pub fn new(pitch: u8, start: T, end: T, velocity: u8) -> Self {
        Self {
            pitch,
            start,
            end,
            velocity,
        }
    }

    /// Same note with both time fields mapped through `f`.
    pub fn map_time<U>(self, mut f: impl FnMut(T) -> U) -> Note<U> {
        Note {
            pitch: self.pitch,
            start: f(self.start),
            end: f(self.end),
            velocity: self.velocity,
        }
    }
}

impl<T: Serialize> Serialize for Note<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.pitch, &self.start, &self.end, self.velocity).serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Note<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (pitch, start, end, velocity) = <(u8, T, T, u8)>::deserialize(deserializer)?;
        Ok(Self {
            pitch,
            start,
            end,
            velocity,
        })
    }
}

/// Time signature change, placed in seconds on the normalized timeline.
///
/// Serializes as `[numerator, denominator, time]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignatureChange {
    pub numerator: u8,
    pub denominator: u8,
    pub time: f64,
}

impl Serialize for TimeSignatureChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.numerator, self.denominator, self.time).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeSignatureChange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (numerator, denominator, time) = <(u8, u8, f64)>::deserialize(deserializer)?;
        Ok(Self {
            numerator,
            denominator,
            time,
        })
    }
}

const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Key signature as a key number: 0..=11 major (tonic pitch class),
/// 12..=23 minor (tonic pitch class + 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(pub u8);

impl Key {
    /// From the SMF encoding: sharps (positive) or flats (negative), and mode.
    pub fn from_sharps(sharps: i8, minor: bool) -> Self {
        let major_tonic = (7 * sharps as i32).rem_euclid(12) as u8;
        if minor {
            Key((major_tonic + 9) % 12 + 12)
        } else {
            Key(major_tonic)
        }
    }

    pub fn is_minor(&self) -> bool {
        self.0 >= 12
    }

    pub fn tonic(&self) -> u8 {
        self.0 % 12
    }

    /// Back to the SMF encoding, preferring the spelling with the fewest
    /// accidentals (flats on the six-accidental tie).
    pub fn to_sharps(&self) -> (i8, bool) {
        let minor = self.is_minor();
        let major_tonic = if minor {
            (self.tonic() + 3) % 12
        } else {
            self.tonic()
        };
        let sharps = (-6i8..=6)
            .find(|s| (7 * *s as i32).rem_euclid(12) as u8 == major_tonic)
            .unwrap_or(0);
        (sharps, minor)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = if self.is_minor() { "minor" } else { "major" };
        write!(f, "{} {}", PITCH_CLASS_NAMES[self.tonic() as usize], mode)
    }
}

/// Key signature change, placed in seconds on the normalized timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeySignatureChange {
    pub key: Key,
    pub time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn note_serializes_as_array() {
        let note = Note::new(60, 12i64, 24i64, 90);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, "[60,12,24,90]");

        let back: Note<i64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn time_signature_serializes_as_array() {
        let ts = TimeSignatureChange {
            numerator: 6,
            denominator: 8,
            time: 1.5,
        };
        assert_eq!(serde_json::to_string(&ts).unwrap(), "[6,8,1.5]");
    }

    #[test]
    fn key_from_sharps() {
        assert_eq!(Key::from_sharps(0, false), Key(0)); // C major
        assert_eq!(Key::from_sharps(0, true), Key(21)); // A minor
        assert_eq!(Key::from_sharps(1, false), Key(7)); // G major
        assert_eq!(Key::from_sharps(-1, false), Key(5)); // F major
        assert_eq!(Key::from_sharps(-3, true), Key(12)); // C minor
        assert_eq!(Key::from_sharps(4, false), Key(4)); // E major
    }

    #[test]
    fn key_sharps_round_trip() {
        for sharps in -7i8..=7 {
            for minor in [false, true] {
                let key = Key::from_sharps(sharps, minor);
                let (back, back_minor) = key.to_sharps();
                assert_eq!(back_minor, minor);
                // Enharmonic spellings (e.g. 7 sharps vs 5 flats) collapse.
                assert_eq!(Key::from_sharps(back, back_minor), key);
            }
        }
    }

    #[test]
    fn key_display() {
        assert_eq!(Key(9).to_string(), "A major");
        assert_eq!(Key(14).to_string(), "D minor");
    }
}
