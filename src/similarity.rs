//! Keyword-signature similarity and tag overlap between notes.
//!
//! A signature keeps only the top terms of a text, so the score is an
//! approximation of topical overlap, not semantic similarity.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::error::{SearchError, SearchOutcome};
use crate::tokenizer;
use crate::types::{
    fold_tag, KeywordSignature, NoteRecord, SimilarityOptions, SimilarityResult, TagRelatedNote,
};

/// Up to `size` terms of `text` by descending frequency, ties broken by
/// first occurrence.
pub fn keyword_signature(text: &str, size: usize) -> KeywordSignature {
    // term -> (count, first position)
    let mut stats: HashMap<String, (usize, usize)> = HashMap::new();
    for (pos, term) in tokenizer::tokenize(text).into_iter().enumerate() {
        stats.entry(term).or_insert((0, pos)).0 += 1;
    }
    let mut ranked: Vec<(String, (usize, usize))> = stats.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.1 .1.cmp(&b.1 .1)));
    KeywordSignature {
        terms: ranked.into_iter().take(size).map(|(term, _)| term).collect(),
    }
}

/// |A ∩ B| / |A ∪ B| over the signatures' term sets. Zero when either is empty.
pub fn jaccard(a: &KeywordSignature, b: &KeywordSignature) -> f64 {
    let left: HashSet<&str> = a.terms.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.terms.iter().map(String::as_str).collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

/// Terms of `reference` also present in `other`, in reference order.
pub fn common_keywords(reference: &KeywordSignature, other: &KeywordSignature) -> Vec<String> {
    reference
        .terms
        .iter()
        .filter(|t| other.contains(t))
        .cloned()
        .collect()
}

/// Validate options and resolve the effective similarity threshold.
pub fn validate_options(options: &SimilarityOptions, default_min: f64) -> SearchOutcome<f64> {
    if options.limit == 0 {
        return Err(SearchError::invalid("limit", "must be greater than zero"));
    }
    let min = options.min_similarity.unwrap_or(default_min);
    if !(min > 0.0 && min <= 1.0) {
        return Err(SearchError::invalid("min_similarity", "must lie in (0, 1]"));
    }
    Ok(min)
}

/// Candidates whose signature overlaps `reference` by at least
/// `min_similarity`, best first, excluding `options.exclude_note_id`.
pub fn rank_similar(
    reference: &KeywordSignature,
    candidates: Vec<NoteRecord>,
    options: &SimilarityOptions,
    min_similarity: f64,
    signature_size: usize,
) -> Vec<SimilarityResult> {
    if reference.is_empty() {
        return Vec::new();
    }
    let excluded = options.exclude_note_id.as_deref();

    let mut results: Vec<SimilarityResult> = candidates
        .into_iter()
        .filter(|note| Some(note.id.as_str()) != excluded)
        .filter_map(|note| {
            let signature = keyword_signature(&note.full_text(), signature_size);
            let score = jaccard(reference, &signature);
            if score <= 0.0 || score < min_similarity {
                return None;
            }
            Some(SimilarityResult {
                common_keywords: common_keywords(reference, &signature),
                similarity_score: score,
                note,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity_score
            .total_cmp(&a.similarity_score)
            .then_with(|| by_recency(&a.note, &b.note))
    });
    results.truncate(options.limit);
    results
}

/// Notes sharing at least one tag with `reference`, most shared tags first.
pub fn rank_by_tags(reference: &NoteRecord, candidates: &[NoteRecord], limit: usize) -> Vec<TagRelatedNote> {
    let wanted: HashSet<String> = reference.tags.iter().map(|t| fold_tag(t)).collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut related: Vec<TagRelatedNote> = candidates
        .iter()
        .filter(|note| note.id != reference.id)
        .filter_map(|note| {
            let mut seen = HashSet::new();
            let shared_tags: Vec<String> = note
                .tags
                .iter()
                .filter(|t| {
                    let key = fold_tag(t);
                    wanted.contains(&key) && seen.insert(key)
                })
                .cloned()
                .collect();
            (!shared_tags.is_empty()).then(|| TagRelatedNote {
                note: note.clone(),
                shared_tags,
            })
        })
        .collect();

    related.sort_by(|a, b| {
        b.shared_tags
            .len()
            .cmp(&a.shared_tags.len())
            .then_with(|| by_recency(&a.note, &b.note))
    });
    related.truncate(limit);
    related
}

fn by_recency(a: &NoteRecord, b: &NoteRecord) -> Ordering {
    b.modified_at
        .cmp(&a.modified_at)
        .then_with(|| a.id.cmp(&b.id))
}
