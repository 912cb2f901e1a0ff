//! Title similarity. Two independent checks, either of which flags a duplicate:
//!
//! - prefix containment: the first `prefix_len` characters of one lower-cased
//!   title appear somewhere in the other
//! - keyword overlap: shared keywords divided by the smaller keyword set
//!   reaches `keyword_overlap`
//!
//! An empty candidate title trivially passes the prefix check against any
//! existing title. Callers must reject empty titles before asking.

use std::collections::HashSet;

use crate::config::SimilarityConfig;

/// Filler words long enough to survive the length filter but carrying no topic.
const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "being", "could", "does", "each", "every",
    "from", "have", "into", "just", "make", "more", "most", "only", "over", "should", "some",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those", "under",
    "very", "were", "what", "when", "where", "which", "while", "will", "with", "would", "your",
];

/// Lower-case (ASCII only) and replace everything that is not a word
/// character with a space, collapsing runs of whitespace.
pub fn normalize(title: &str) -> String {
    let replaced: String = title
        .to_ascii_lowercase()
        .chars()
        .map(|c| if is_word_char(c) { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokens longer than `min_keyword_len` characters, minus stop words.
pub fn keywords(title: &str, config: &SimilarityConfig) -> HashSet<String> {
    title
        .to_ascii_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|t| t.chars().count() > config.min_keyword_len)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// `|a ∩ b| / min(|a|, |b|)`. Zero when either side is empty.
pub fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / smaller as f64
}

fn prefix(title: &str, len: usize) -> String {
    title.trim().to_ascii_lowercase().chars().take(len).collect()
}

fn prefix_contained(candidate: &str, existing: &str, config: &SimilarityConfig) -> bool {
    let cand = candidate.trim().to_ascii_lowercase();
    let other = existing.trim().to_ascii_lowercase();
    other.contains(&prefix(&cand, config.prefix_len))
        || cand.contains(&prefix(&other, config.prefix_len))
}

/// Returns true if `candidate` looks like a duplicate of any title in `existing`.
///
/// Empty existing titles are ignored; an empty candidate matches any
/// non-empty existing title.
pub fn is_duplicate<S: AsRef<str>>(
    candidate: &str,
    existing: &[S],
    config: &SimilarityConfig,
) -> bool {
    let candidate_keywords = keywords(candidate, config);
    existing
        .iter()
        .map(AsRef::as_ref)
        .filter(|title| !title.trim().is_empty())
        .any(|title| {
            prefix_contained(candidate, title, config)
                || keyword_overlap(&candidate_keywords, &keywords(title, config))
                    >= config.keyword_overlap
        })
}

// --- Dedup signatures ---

/// The `{first-N-words, keyword-set}` pair used by the dedup pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub lead: String,
    pub keywords: HashSet<String>,
}

impl Signature {
    pub fn of(title: &str, config: &SimilarityConfig) -> Self {
        let normalized = normalize(title);
        let lead = normalized
            .split(' ')
            .filter(|w| !w.is_empty())
            .take(config.signature_words)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            lead,
            keywords: keywords(title, config),
        }
    }

    pub fn matches(&self, other: &Signature, config: &SimilarityConfig) -> bool {
        (!self.lead.is_empty() && self.lead == other.lead)
            || keyword_overlap(&self.keywords, &other.keywords) >= config.keyword_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SimilarityConfig {
        SimilarityConfig::default()
    }

    #[test]
    fn normalize_strips_punctuation_and_collapses_spaces() {
        assert_eq!(normalize("  Fix: audit-report  (v2)! "), "fix audit report v2");
    }

    #[test]
    fn keywords_drop_short_tokens_and_stop_words() {
        let kw = keywords("Add tests for the audit-report with care", &cfg());
        let mut sorted: Vec<_> = kw.into_iter().collect();
        sorted.sort();
        assert_eq!(sorted, vec!["audit", "care", "report", "tests"]);
    }

    #[test]
    fn overlap_is_zero_for_empty_sets() {
        let empty = HashSet::new();
        let some = keywords("platform health probe", &cfg());
        assert_eq!(keyword_overlap(&empty, &some), 0.0);
    }

    #[test]
    fn signature_lead_uses_first_words_only() {
        let sig = Signature::of("One two three four five six seven", &cfg());
        assert_eq!(sig.lead, "one two three four five six");
    }
}
