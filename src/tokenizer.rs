//! Text normalisation shared by search, suggestions and similarity.
//!
//! Text is split on runs of non-alphanumeric characters, lowercased, and
//! filtered: tokens shorter than [`MIN_TERM_CHARS`] and stopwords are dropped.
//! Output order follows the input left to right.

/// Shortest token kept, in characters.
pub const MIN_TERM_CHARS: usize = 3;

/// Articles, conjunctions, pronouns and auxiliaries. Kept sorted for binary search.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "before", "being", "but", "by", "can", "could", "did", "does", "for", "from", "had",
    "has", "have", "he", "her", "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "just", "may", "me", "might", "mine", "more", "must", "my", "no", "nor", "not", "of",
    "on", "or", "our", "ours", "shall", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those", "to",
    "too", "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom",
    "why", "will", "with", "would", "yet", "you", "your", "yours",
];

/// Whether `term` (already lowercased) is a stopword.
pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.binary_search(&term).is_ok()
}

/// Normalised terms of `text`, in order of occurrence. Never fails; empty
/// input gives an empty vector.
pub fn tokenize(text: &str) -> Vec<String> {
    terms(text, false)
}

/// Like [`tokenize`], but `preserve_case` keeps the original casing of each
/// kept token. The length and stopword filters always look at the
/// lowercased form, so both variants keep the same positions.
pub fn terms(text: &str, preserve_case: bool) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|raw| !raw.is_empty())
        .filter_map(|raw| {
            let lower = raw.to_lowercase();
            if lower.chars().count() < MIN_TERM_CHARS || is_stopword(&lower) {
                return None;
            }
            Some(if preserve_case { raw.to_string() } else { lower })
        })
        .collect()
}

/// Query terms with duplicates removed, first occurrence kept.
pub fn unique_terms(text: &str, preserve_case: bool) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    terms(text, preserve_case)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
