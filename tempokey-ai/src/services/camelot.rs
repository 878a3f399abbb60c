//! Standard key to Camelot wheel notation

use crate::models::analysis::UNKNOWN_CAMELOT;

/// Major keys are the "B" ring, minor keys the "A" ring. Enharmonic
/// spellings share a slot.
const CAMELOT_TABLE: &[(&str, &str)] = &[
    ("B Major", "1B"),
    ("F# Major", "2B"),
    ("Gb Major", "2B"),
    ("Db Major", "3B"),
    ("C# Major", "3B"),
    ("Ab Major", "4B"),
    ("G# Major", "4B"),
    ("Eb Major", "5B"),
    ("D# Major", "5B"),
    ("Bb Major", "6B"),
    ("A# Major", "6B"),
    ("F Major", "7B"),
    ("C Major", "8B"),
    ("G Major", "9B"),
    ("D Major", "10B"),
    ("A Major", "11B"),
    ("E Major", "12B"),
    ("Ab Minor", "1A"),
    ("G# Minor", "1A"),
    ("Eb Minor", "2A"),
    ("D# Minor", "2A"),
    ("Bb Minor", "3A"),
    ("A# Minor", "3A"),
    ("F Minor", "4A"),
    ("C Minor", "5A"),
    ("G Minor", "6A"),
    ("D Minor", "7A"),
    ("A Minor", "8A"),
    ("E Minor", "9A"),
    ("B Minor", "10A"),
    ("F# Minor", "11A"),
    ("Gb Minor", "11A"),
    ("Db Minor", "12A"),
    ("C# Minor", "12A"),
];

/// Format a key/scale pair the way it is stored: `"C Major"`, `"F# Minor"`
pub fn standard_key(key: &str, scale: &str) -> String {
    let mut chars = scale.chars();
    let scale: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };
    format!("{} {}", key, scale)
}

/// Camelot code for a standard key, or `"Unknown"`
pub fn camelot_key(standard: &str) -> &'static str {
    CAMELOT_TABLE
        .iter()
        .find(|(name, _)| *name == standard)
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_CAMELOT)
}
