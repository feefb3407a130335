//! # Musical Tuning Module
//!
//! Named guitar tuning profiles and equal temperament helpers.
//!
//! ## Features
//! - Built-in profiles: standard, open C, open D, drop C, drop D
//! - Lookup that never fails: unknown names fall back to standard tuning
//! - Cent deviation between a measured and a target frequency

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::warn;

/// Name of the profile used when a lookup does not match.
pub const STANDARD: &str = "standard";

/// Chromatic note names starting at A, the equal-tempered reference note.
pub const NOTE_NAMES: [&str; 12] = [
    "A", "A#", "B", "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#",
];

/// A named set of string target frequencies.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningProfile {
    /// Registry key (e.g., "standard", "drop_d")
    pub name: &'static str,
    /// Note label and target frequency in Hz, lowest string first
    pub notes: &'static [(&'static str, f64)],
}

const STANDARD_TUNING: TuningProfile = TuningProfile {
    name: STANDARD,
    notes: &[
        ("E2", 82.41),
        ("A2", 110.0),
        ("D3", 146.83),
        ("G3", 196.0),
        ("B3", 246.94),
        ("E4", 329.63),
    ],
};

const OPEN_C_TUNING: TuningProfile = TuningProfile {
    name: "open_c",
    notes: &[
        ("C2", 65.41),
        ("G2", 98.0),
        ("C3", 130.81),
        ("G3", 196.0),
        ("C4", 261.63),
        ("E4", 329.63),
    ],
};

const OPEN_D_TUNING: TuningProfile = TuningProfile {
    name: "open_d",
    notes: &[
        ("D2", 73.42),
        ("A2", 110.0),
        ("D3", 146.83),
        ("F#3", 185.0),
        ("A3", 220.0),
        ("D4", 293.66),
    ],
};

const DROP_C_TUNING: TuningProfile = TuningProfile {
    name: "drop_c",
    notes: &[
        ("C2", 65.41),
        ("G2", 98.0),
        ("C3", 130.81),
        ("G3", 196.0),
        ("C4", 261.63),
        ("F4", 349.23),
    ],
};

const DROP_D_TUNING: TuningProfile = TuningProfile {
    name: "drop_d",
    notes: &[
        ("D2", 73.42),
        ("A2", 110.0),
        ("D3", 146.83),
        ("G3", 196.0),
        ("B3", 246.94),
        ("E4", 329.63),
    ],
};

/// All built-in profiles, keyed by name.
///
/// Built once on first use and never mutated afterwards.
static REGISTRY: Lazy<BTreeMap<&'static str, TuningProfile>> = Lazy::new(|| {
    [
        STANDARD_TUNING,
        OPEN_C_TUNING,
        OPEN_D_TUNING,
        DROP_C_TUNING,
        DROP_D_TUNING,
    ]
    .into_iter()
    .map(|profile| (profile.name, profile))
    .collect()
});

/// Finds a tuning profile by name.
///
/// Unknown names resolve to the standard profile, so this never fails.
pub fn lookup(name: &str) -> &'static TuningProfile {
    match REGISTRY.get(name) {
        Some(profile) => profile,
        None => {
            warn!(requested = name, "unknown tuning, falling back to standard");
            &REGISTRY[STANDARD]
        }
    }
}

/// Names of every built-in profile, in sorted order.
pub fn profile_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents make a semitone; positive values are sharp, negative values flat.
pub fn calculate_cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn every_builtin_profile_is_registered() {
        let names: Vec<_> = profile_names().collect();
        assert_eq!(names, vec!["drop_c", "drop_d", "open_c", "open_d", "standard"]);
    }

    #[test]
    fn unknown_name_falls_back_to_standard() {
        assert_eq!(lookup("baritone"), lookup(STANDARD));
        assert_eq!(lookup("").name, STANDARD);
    }

    #[test]
    fn profiles_are_ascending_with_unique_labels() {
        for name in profile_names() {
            let profile = lookup(name);
            assert_eq!(profile.notes.len(), 6);
            assert!(profile.notes.windows(2).all(|w| w[0].1 < w[1].1), "{name}");
            for (i, (label, _)) in profile.notes.iter().enumerate() {
                assert!(profile.notes[i + 1..].iter().all(|(other, _)| other != label));
            }
        }
    }

    #[test]
    fn drop_d_lowers_only_the_low_string() {
        let drop_d = lookup("drop_d");
        let standard = lookup(STANDARD);
        assert_eq!(drop_d.notes[0], ("D2", 73.42));
        assert_eq!(drop_d.notes[1..], standard.notes[1..]);
    }

    #[test]
    fn cents_deviation() {
        assert_relative_eq!(calculate_cents_deviation(440.0, 440.0), 0.0);
        assert_relative_eq!(calculate_cents_deviation(880.0, 440.0), 1200.0);
        assert_relative_eq!(calculate_cents_deviation(220.0, 440.0), -1200.0);
    }
}
