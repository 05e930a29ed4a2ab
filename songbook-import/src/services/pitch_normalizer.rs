//! Pitch notation normalizer
//!
//! Maps a raw pitch token from an import source onto one canonical pitch:
//!
//! - a chromatic letter `C C# D D# E F F# G G# A A# B`
//! - a letter with a ` major` / ` minor` suffix
//! - one of thirteen Madhyam positions (`1 Madhyam` … `7 Madhyam`)
//!
//! **Algorithm:**
//! 1. Empty input → `None` (blank, not unrecognized)
//! 2. Clean: trim, drop every whitespace character, U+00A0 and U+200B.
//!    Case is preserved: `4M` is F major, `4m` is F minor.
//! 3. Exact lookup: session custom mappings, then the static table
//! 4. Bare letter fallback: `^[A-Ga-g]#?$` is uppercased and accepted
//! 5. Otherwise `None`
//!
//! The numeric scale maps 3.5 to F and 7.5 to C. Both aliases are part of
//! the source notation and are kept as-is.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Numeric scale positions and their letter equivalents
const SCALE_POSITIONS: [(&str, &str); 14] = [
    ("1", "C"),
    ("1.5", "C#"),
    ("2", "D"),
    ("2.5", "D#"),
    ("3", "E"),
    ("3.5", "F"),
    ("4", "F"),
    ("4.5", "F#"),
    ("5", "G"),
    ("5.5", "G#"),
    ("6", "A"),
    ("6.5", "A#"),
    ("7", "B"),
    ("7.5", "C"),
];

/// Madhyam positions (the thirteen values of the canonical vocabulary)
const MADHYAM_POSITIONS: [&str; 13] = [
    "1", "1.5", "2", "2.5", "3", "3.5", "4", "4.5", "5", "5.5", "6", "6.5", "7",
];

/// Chromatic letters, sharps only
const CHROMATIC: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Numeric display form for each chromatic letter
const LETTER_NUMERALS: [(&str, &str); 12] = [
    ("C", "1"),
    ("C#", "1.5"),
    ("D", "2"),
    ("D#", "2.5"),
    ("E", "3"),
    ("F", "4"),
    ("F#", "4.5"),
    ("G", "5"),
    ("G#", "5.5"),
    ("A", "6"),
    ("A#", "6.5"),
    ("B", "7"),
];

/// Western flats and their sharp equivalents
const FLATS: [(&str, &str); 5] = [
    ("Db", "C#"),
    ("Eb", "D#"),
    ("Gb", "F#"),
    ("Ab", "G#"),
    ("Bb", "A#"),
];

const MAJOR_SUFFIX: &str = " major";
const MINOR_SUFFIX: &str = " minor";
const MADHYAM_SUFFIX: &str = " Madhyam";

static BARE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Ga-g]#?$").expect("bare letter regex is valid"));

/// Static source-token → canonical table
static PITCH_TABLE: Lazy<HashMap<String, String>> = Lazy::new(build_static_table);

/// Closed canonical vocabulary
static CANONICAL: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut set = HashSet::new();
    for letter in CHROMATIC {
        set.insert(letter.to_string());
        set.insert(format!("{letter}{MAJOR_SUFFIX}"));
        set.insert(format!("{letter}{MINOR_SUFFIX}"));
    }
    for position in MADHYAM_POSITIONS {
        set.insert(format!("{position}{MADHYAM_SUFFIX}"));
    }
    set
});

fn build_static_table() -> HashMap<String, String> {
    let mut table = HashMap::new();

    let letter_forms = |source: &str, letter: &str, table: &mut HashMap<String, String>| {
        table.insert(format!("{source}M"), format!("{letter}{MAJOR_SUFFIX}"));
        table.insert(format!("{source}m"), format!("{letter}{MINOR_SUFFIX}"));
        table.insert(format!("{source}major"), format!("{letter}{MAJOR_SUFFIX}"));
        table.insert(format!("{source}minor"), format!("{letter}{MINOR_SUFFIX}"));
    };

    // Numeric positions: plain, major, minor, Pancham
    for (position, letter) in SCALE_POSITIONS {
        table.insert(position.to_string(), letter.to_string());
        table.insert(format!("{position}M"), format!("{letter}{MAJOR_SUFFIX}"));
        table.insert(format!("{position}m"), format!("{letter}{MINOR_SUFFIX}"));
        table.insert(format!("{position}Pancham"), letter.to_string());
        table.insert(format!("{position}pancham"), letter.to_string());
        table.insert(format!("{position}Pancham/{letter}"), letter.to_string());
    }

    // Letters with major/minor markers
    for letter in CHROMATIC {
        letter_forms(letter, letter, &mut table);
        table.insert(format!("Pancham/{letter}"), letter.to_string());
    }

    // Flats collapse to sharps
    for (flat, sharp) in FLATS {
        table.insert(flat.to_string(), sharp.to_string());
        letter_forms(flat, sharp, &mut table);
    }

    // Madhyam positions
    for position in MADHYAM_POSITIONS {
        let canonical = format!("{position}{MADHYAM_SUFFIX}");
        table.insert(format!("{position}Madhyam"), canonical.clone());
        table.insert(format!("{position}madhyam"), canonical.clone());
        table.insert(format!("{position}MADHYAM"), canonical.clone());
        table.insert(format!("{position}Ma"), canonical);
    }

    table
}

/// Clean a raw token for lookup and for use as a mapping key
///
/// Trims and removes all whitespace, non-breaking spaces and zero-width
/// spaces. Case is preserved.
pub fn clean_pitch_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{00A0}' && *c != '\u{200B}')
        .collect()
}

/// Whether a value belongs to the canonical pitch vocabulary
pub fn is_canonical_pitch(value: &str) -> bool {
    CANONICAL.contains(value)
}

/// Whether a raw pitch is a blank placeholder (`""`, `-`, `null`, `n/a`)
///
/// Rows with placeholder pitches are dropped instead of being offered for
/// pitch correction.
pub fn is_blank_pitch(raw: &str) -> bool {
    let trimmed = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{200B}');
    trimmed.is_empty()
        || trimmed == "-"
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("n/a")
}

/// Normalize using the static table only
pub fn normalize_pitch(raw: &str) -> Option<String> {
    lookup(raw, None)
}

fn lookup(raw: &str, custom: Option<&HashMap<String, String>>) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let cleaned = clean_pitch_token(raw);
    if cleaned.is_empty() {
        return None;
    }

    if let Some(canonical) = custom.and_then(|c| c.get(&cleaned)) {
        return Some(canonical.clone());
    }

    if let Some(canonical) = PITCH_TABLE.get(&cleaned) {
        return Some(canonical.clone());
    }

    if BARE_LETTER.is_match(&cleaned) {
        return Some(cleaned.to_uppercase());
    }

    None
}

/// Session-owned pitch table
///
/// Wraps the static table with a mutable layer of custom mappings added by
/// manual correction or loaded from persisted mappings. Custom entries take
/// precedence over the static table. Each session owns its own table, so
/// corrections never leak between sessions.
#[derive(Debug, Clone, Default)]
pub struct PitchTable {
    custom: HashMap<String, String>,
}

impl PitchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a raw token, consulting custom mappings first
    pub fn normalize(&self, raw: &str) -> Option<String> {
        lookup(raw, Some(&self.custom))
    }

    /// Add or replace a custom mapping; the source is cleaned first
    ///
    /// Returns the previous canonical value for that source, if any.
    pub fn add_mapping(&mut self, source: &str, canonical: &str) -> Option<String> {
        let key = clean_pitch_token(source);
        tracing::debug!(token = %key, canonical = %canonical, "Adding pitch mapping");
        self.custom.insert(key, canonical.to_string())
    }

    /// Remove a custom mapping; static entries are never removed
    pub fn remove_mapping(&mut self, source: &str) -> Option<String> {
        let key = clean_pitch_token(source);
        tracing::debug!(token = %key, "Removing pitch mapping");
        self.custom.remove(&key)
    }

    /// Whether a custom mapping exists for the (cleaned) source
    pub fn has_custom_mapping(&self, source: &str) -> bool {
        self.custom.contains_key(&clean_pitch_token(source))
    }

    pub fn custom_len(&self) -> usize {
        self.custom.len()
    }
}

/// Human label for a pitch: numeric notation with the letter in parentheses
///
/// `D major` → `2M (D)`, `D minor` → `2m (D)`, `D` → `2 (D)`. Madhyam
/// values are already numeric and are shown as-is. Unrecognized input is
/// returned unchanged.
pub fn format_for_display(raw: &str) -> String {
    let Some(canonical) = normalize_pitch(raw) else {
        return raw.to_string();
    };

    if canonical.ends_with(MADHYAM_SUFFIX) {
        return canonical;
    }

    let (letter, marker) = if let Some(letter) = canonical.strip_suffix(MAJOR_SUFFIX) {
        (letter, "M")
    } else if let Some(letter) = canonical.strip_suffix(MINOR_SUFFIX) {
        (letter, "m")
    } else {
        (canonical.as_str(), "")
    };

    match LETTER_NUMERALS.iter().find(|(l, _)| *l == letter) {
        Some((_, numeral)) => format!("{numeral}{marker} ({letter})"),
        None => canonical.clone(),
    }
}
