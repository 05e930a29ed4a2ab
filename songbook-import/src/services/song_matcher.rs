//! Song name matcher
//!
//! Scores a candidate song name against catalog titles on a 0-100 scale.
//!
//! **Algorithm:**
//! 1. Normalize both names (see [`normalize_song_name`])
//! 2. Equal normalized names score exactly 100
//! 3. Otherwise blend two signals, weighted 70/30:
//!    - strict common-prefix length / shorter length, scaled to 0-70
//!    - Levenshtein similarity `(max_len - distance) / max_len`, scaled to 0-30
//! 4. Round and cap at 100
//!
//! Devotional titles are often truncated or extended with a subtitle after
//! a shared opening phrase, so the prefix signal dominates.

use crate::models::Song;

/// Weight of the common-prefix signal
const PREFIX_WEIGHT: f64 = 70.0;

/// Weight of the edit-distance signal
const DISTANCE_WEIGHT: f64 = 30.0;

/// Whole-word transliteration variants
const WORD_VARIANTS: [(&str, &str); 7] = [
    ("shree", "sri"),
    ("shri", "sri"),
    ("shre", "sri"),
    ("jaya", "jai"),
    ("hey", "he"),
    ("aum", "om"),
    ("ohm", "om"),
];

/// A catalog entry with its similarity to the query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SongMatch<'a> {
    pub song: &'a Song,
    pub similarity: u8,
}

fn word_variant(word: &str) -> Option<&'static str> {
    WORD_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == word)
        .map(|(_, canonical)| *canonical)
}

/// Collapse runs of the same vowel (`aadi` → `adi`, `saai` → `sai`)
fn collapse_doubled_vowels(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut previous: Option<char> = None;
    for c in word.chars() {
        let is_vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
        if is_vowel && previous == Some(c) {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

fn canonicalize_word(word: &str) -> String {
    if let Some(canonical) = word_variant(word) {
        return canonical.to_string();
    }
    let collapsed = collapse_doubled_vowels(word);
    match word_variant(&collapsed) {
        Some(canonical) => canonical.to_string(),
        None => collapsed,
    }
}

/// Normalize a song name for comparison and for mapping keys
///
/// Lowercase, trim, strip trailing punctuation and whitespace, collapse
/// internal whitespace, then canonicalize common transliteration variants
/// word by word.
pub fn normalize_song_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let trimmed = lowered
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());

    trimmed
        .split_whitespace()
        .map(canonicalize_word)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the strict common prefix, in characters
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

fn score_normalized(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let min_len = len_a.min(len_b) as f64;
    let max_len = len_a.max(len_b) as f64;

    let prefix_score = common_prefix_len(a, b) as f64 / min_len * PREFIX_WEIGHT;

    let distance = strsim::levenshtein(a, b) as f64;
    let distance_score = ((max_len - distance) / max_len).max(0.0) * DISTANCE_WEIGHT;

    (prefix_score + distance_score).round().min(100.0) as u8
}

/// Similarity between two song names, 0-100
///
/// `similarity(x, x) == 100` for any name that is non-empty after
/// normalization. The score is not a metric and need not be symmetric in
/// general.
pub fn similarity(a: &str, b: &str) -> u8 {
    score_normalized(&normalize_song_name(a), &normalize_song_name(b))
}

/// Best catalog match scoring at least `threshold`
///
/// Ties keep the first-encountered entry. Stops early on a perfect score.
/// Returns `None` when the best score is below `threshold`, even if it is
/// the unique maximum.
pub fn best_match<'a>(query: &str, catalog: &'a [Song], threshold: u8) -> Option<SongMatch<'a>> {
    let query = normalize_song_name(query);
    if query.is_empty() {
        return None;
    }

    let mut best: Option<SongMatch<'a>> = None;
    for song in catalog {
        let score = score_normalized(&query, &normalize_song_name(&song.name));
        if best.map_or(true, |b| score > b.similarity) {
            best = Some(SongMatch {
                song,
                similarity: score,
            });
            if score == 100 {
                break;
            }
        }
    }

    best.filter(|b| b.similarity >= threshold)
}

/// Top `n` catalog matches, highest first, without a threshold
///
/// Equal scores keep catalog order.
pub fn top_matches<'a>(query: &str, catalog: &'a [Song], n: usize) -> Vec<SongMatch<'a>> {
    let query = normalize_song_name(query);
    if query.is_empty() || n == 0 {
        return Vec::new();
    }

    let mut scored: Vec<SongMatch<'a>> = catalog
        .iter()
        .map(|song| SongMatch {
            song,
            similarity: score_normalized(&query, &normalize_song_name(&song.name)),
        })
        .collect();

    scored.sort_by(|a, b| b.similarity.cmp(&a.similarity));
    scored.truncate(n);
    scored
}

/// The single catalog song whose normalized title starts with the query
///
/// Returns `None` when zero or several titles share the prefix; ambiguity is
/// left for manual selection.
pub fn unique_prefix_match<'a>(query: &str, catalog: &'a [Song]) -> Option<&'a Song> {
    let query = normalize_song_name(query);
    if query.is_empty() {
        return None;
    }

    let mut candidates = catalog
        .iter()
        .filter(|song| normalize_song_name(&song.name).starts_with(&query));

    let first = candidates.next()?;
    if candidates.next().is_some() {
        tracing::debug!(query = %query, "Prefix fallback ambiguous, leaving unresolved");
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Song> {
        vec![
            Song::new("1", "Om Namah Shivaya"),
            Song::new("2", "Raghu Pathey Raaghava Raja Rama"),
            Song::new("3", "Shree Ganesha Pahimam"),
            Song::new("4", "Jaya Jaya Devi"),
        ]
    }

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_song_name("  Shree Ganesha!!  "), "sri ganesha");
        assert_eq!(normalize_song_name("Aadi Deva"), "adi deva");
        assert_eq!(normalize_song_name("Saai Ram"), "sai ram");
        assert_eq!(normalize_song_name("Jaya Hey"), "jai he");
        assert_eq!(normalize_song_name("AUM Namah"), "om namah");
        assert_eq!(normalize_song_name("Ohm   Sai..."), "om sai");
        assert_eq!(normalize_song_name("Jaaya Ma"), "jai ma");
    }

    #[test]
    fn test_self_similarity_is_100() {
        for name in ["Om Sai Ram", "a", "Raghu Pathey Raaghava Raja Rama", "Shri"] {
            assert_eq!(similarity(name, name), 100);
        }
    }

    #[test]
    fn test_punctuation_only_self_similarity_is_100() {
        for name in ["!!!", "...", " - ", ""] {
            assert_eq!(similarity(name, name), 100, "{name:?}");
        }
        assert_eq!(similarity("!!!", "Om Sai Ram"), 0);
    }

    #[test]
    fn test_variant_spellings_are_identical() {
        assert_eq!(similarity("Shri Ganesha Pahimam", "Shree Ganesha Pahimam"), 100);
        assert_eq!(similarity("Sai Ram.", "saai ram"), 100);
    }

    #[test]
    fn test_empty_scores_zero() {
        assert_eq!(similarity("", "Om"), 0);
        assert_eq!(similarity("...", "Om"), 0);
    }

    #[test]
    fn test_prefix_weighting() {
        // "raghu pathey" (12) is a strict prefix of the 30-character title:
        // 70 * 12/12 + 30 * (30 - 18)/30 = 82
        assert_eq!(similarity("Raghu Pathey", "Raghu Pathey Raaghava Raja Rama"), 82);
    }

    #[test]
    fn test_no_shared_prefix() {
        // Prefix contributes nothing; only the distance signal remains
        let score = similarity("abc", "xyz");
        assert_eq!(score, 0);
    }

    #[test]
    fn test_best_match_exact() {
        let catalog = catalog();
        let hit = best_match("om namah shivaya", &catalog, 90).unwrap();
        assert_eq!(hit.song.id, "1");
        assert_eq!(hit.similarity, 100);
    }

    #[test]
    fn test_best_match_threshold_contract() {
        let catalog = catalog();
        // True maximum is 82, below the threshold
        assert!(best_match("Raghu Pathey", &catalog, 90).is_none());
        let hit = best_match("Raghu Pathey", &catalog, 82).unwrap();
        assert_eq!(hit.song.id, "2");
    }

    #[test]
    fn test_best_match_ties_keep_first() {
        let catalog = vec![Song::new("a", "Om Sai"), Song::new("b", "Om Sai")];
        let hit = best_match("Om Sai Ram", &catalog, 0).unwrap();
        assert_eq!(hit.song.id, "a");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(best_match("", &catalog(), 0).is_none());
        assert!(best_match("Om", &[], 0).is_none());
        assert!(top_matches("", &catalog(), 3).is_empty());
        assert!(top_matches("Om", &[], 3).is_empty());
    }

    #[test]
    fn test_top_matches_order_and_length() {
        let catalog = catalog();
        let top = top_matches("Om Namah", &catalog, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].song.id, "1");
        assert!(top[0].similarity >= top[1].similarity);

        let all = top_matches("Om Namah", &catalog, 10);
        assert_eq!(all.len(), catalog.len());
    }

    #[test]
    fn test_unique_prefix_match() {
        let catalog = catalog();
        assert_eq!(unique_prefix_match("Raghu Pathey", &catalog).unwrap().id, "2");
        assert!(unique_prefix_match("Nothing Like It", &catalog).is_none());

        let ambiguous = vec![Song::new("1", "Om Sai Ram"), Song::new("2", "Om Sai Natha")];
        assert!(unique_prefix_match("Om Sai", &ambiguous).is_none());
    }
}
