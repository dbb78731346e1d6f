/// Phrase to merge-confidence mapping, checked in order; the first phrase
/// found in the response wins.
pub const CONFIDENCE_TABLE: &[(&str, u8)] = &[
    ("ready to merge", 90),
    ("safe to merge", 85),
    ("minor issues", 75),
    ("requires small changes", 70),
    ("needs review", 60),
    ("possible conflicts", 50),
    ("merge conflicts exist", 40),
    ("requires significant changes", 30),
    ("not recommended", 20),
    ("do not merge", 10),
];

/// Used when no phrase in the table matches.
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Map a free-text model response to a merge-confidence percentage.
///
/// Matching is a case-insensitive substring search. Table order decides
/// between several matching phrases, not their position in the response.
pub fn score(response: &str) -> u8 {
    let lowered = response.to_lowercase();
    CONFIDENCE_TABLE
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
        .map(|(_, score)| *score)
        .unwrap_or(DEFAULT_CONFIDENCE)
}

pub fn as_percentage(score: u8) -> String {
    format!("{score}%")
}
