//! # Note Mapping Module
//!
//! Converts a detected frequency into a note. Two strategies share the
//! [`NoteMapper`] trait so the pipeline does not care which one it runs:
//! - [`ProfileMapper`] snaps to the closest string of a tuning profile
//! - [`EqualTemperedMapper`] names the closest equal-tempered semitone

use crate::tuning::{NOTE_NAMES, TuningProfile};

/// The note a frequency was mapped to.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteMatch {
    /// Note label (e.g., "A2", "F#3")
    pub label: String,
    /// Frequency the note should have, in Hz
    pub frequency: f64,
}

/// Strategy that maps a frequency to the nearest note.
pub trait NoteMapper: Send {
    fn nearest(&self, frequency: f64) -> NoteMatch;
}

/// Nearest-string matching against a tuning profile.
#[derive(Debug, Clone)]
pub struct ProfileMapper {
    profile: &'static TuningProfile,
}

impl ProfileMapper {
    pub fn new(profile: &'static TuningProfile) -> Self {
        Self { profile }
    }
}

impl NoteMapper for ProfileMapper {
    /// Ties keep the entry declared first, which is the lower string for
    /// every built-in profile.
    fn nearest(&self, frequency: f64) -> NoteMatch {
        let mut best: Option<(&str, f64)> = None;
        for &(label, target) in self.profile.notes {
            let closer = match best {
                Some((_, current)) => (target - frequency).abs() < (current - frequency).abs(),
                None => true,
            };
            if closer {
                best = Some((label, target));
            }
        }

        match best {
            Some((label, target)) => NoteMatch {
                label: label.to_string(),
                frequency: target,
            },
            None => NoteMatch {
                label: String::new(),
                frequency: 0.0,
            },
        }
    }
}

/// Absolute naming on the 12-tone equal-tempered scale.
#[derive(Debug, Clone)]
pub struct EqualTemperedMapper {
    concert_pitch: f64,
}

impl EqualTemperedMapper {
    /// # Arguments
    /// * `concert_pitch` - Frequency of A4 in Hz (usually 440.0)
    pub fn new(concert_pitch: f64) -> Self {
        Self { concert_pitch }
    }

    /// Semitones between `frequency` and A4, rounded to the nearest semitone.
    pub fn semitone_offset(&self, frequency: f64) -> i32 {
        (12.0 * (frequency / self.concert_pitch).log2()).round() as i32
    }

    /// Label with octave suffix for a semitone offset from A4 (0 is "A4").
    pub fn label_for_offset(offset: i32) -> String {
        // Octave numbers change at C, nine semitones above A.
        let octave = 4 + (offset + 9).div_euclid(12);
        format!("{}{}", NOTE_NAMES[offset.rem_euclid(12) as usize], octave)
    }

    /// Equal-tempered frequency of the note `offset` semitones from A4.
    pub fn frequency_for_offset(&self, offset: i32) -> f64 {
        self.concert_pitch * 2f64.powf(f64::from(offset) / 12.0)
    }
}

impl NoteMapper for EqualTemperedMapper {
    fn nearest(&self, frequency: f64) -> NoteMatch {
        let offset = self.semitone_offset(frequency);
        NoteMatch {
            label: Self::label_for_offset(offset),
            frequency: self.frequency_for_offset(offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning;
    use approx::assert_relative_eq;

    #[test]
    fn profile_mapper_picks_closest_string() {
        let mapper = ProfileMapper::new(tuning::lookup("standard"));
        assert_eq!(mapper.nearest(83.0).label, "E2");
        assert_eq!(mapper.nearest(112.3).label, "A2");
        let high = mapper.nearest(500.0);
        assert_eq!(high.label, "E4");
        assert_eq!(high.frequency, 329.63);
    }

    #[test]
    fn profile_mapper_breaks_ties_towards_first_entry() {
        static TIED: TuningProfile = TuningProfile {
            name: "tied",
            notes: &[("low", 100.0), ("high", 200.0)],
        };
        let mapper = ProfileMapper::new(&TIED);
        let tie = mapper.nearest(150.0);
        assert_eq!(tie.label, "low");
        assert_eq!(tie.frequency, 100.0);
        assert_eq!(mapper.nearest(150.5).label, "high");
    }

    #[test]
    fn equal_tempered_names_reference_notes() {
        let mapper = EqualTemperedMapper::new(440.0);
        let a4 = mapper.nearest(440.0);
        assert_eq!(a4.label, "A4");
        assert_relative_eq!(a4.frequency, 440.0);

        assert_eq!(mapper.nearest(110.0).label, "A2");
        assert_eq!(mapper.nearest(261.63).label, "C4");
        assert_eq!(mapper.nearest(246.94).label, "B3");
        assert_eq!(mapper.nearest(82.41).label, "E2");
        assert_eq!(mapper.nearest(27.5).label, "A0");
        assert_eq!(mapper.nearest(4186.01).label, "C8");
    }

    #[test]
    fn equal_tempered_snaps_slightly_detuned_notes() {
        let mapper = EqualTemperedMapper::new(440.0);
        let sharp = mapper.nearest(445.0);
        assert_eq!(sharp.label, "A4");
        assert_relative_eq!(sharp.frequency, 440.0);
        assert_eq!(mapper.nearest(452.0).label, "A4");
        assert_eq!(mapper.nearest(455.0).label, "A#4");
    }

    #[test]
    fn equal_tempered_round_trip_is_stable() {
        let mapper = EqualTemperedMapper::new(440.0);
        let mut freq = 30.0;
        while freq < 5000.0 {
            let first = mapper.nearest(freq);
            let again = mapper.nearest(first.frequency);
            assert_eq!(first, again, "round trip failed for {freq} Hz");
            freq *= 1.013;
        }
    }

    #[test]
    fn concert_pitch_shifts_the_scale() {
        let mapper = EqualTemperedMapper::new(432.0);
        let a4 = mapper.nearest(432.0);
        assert_eq!(a4.label, "A4");
        assert_relative_eq!(a4.frequency, 432.0);
    }
}
