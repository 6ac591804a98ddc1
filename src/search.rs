//! Full-text ranking over a candidate set already filtered by the repository.

use std::cmp::Ordering;

use crate::analyzer::MatchAnalyzer;
use crate::config::RankingConfig;
use crate::error::{SearchError, SearchOutcome};
use crate::tokenizer;
use crate::types::{NoteRecord, SearchOptions, SearchResult};

/// Reject malformed options before any repository work.
pub fn validate_options(options: &SearchOptions) -> SearchOutcome<()> {
    if options.limit == 0 {
        return Err(SearchError::invalid("limit", "must be greater than zero"));
    }
    if let Some(range) = &options.created {
        if !range.is_valid() {
            return Err(SearchError::invalid("created", "range start is after its end"));
        }
    }
    if options.tags.iter().any(|t| t.trim().is_empty()) {
        return Err(SearchError::invalid("tags", "tag names must not be empty"));
    }
    Ok(())
}

/// Distinct search terms of `query`, in query order. Casing is kept only
/// for case-sensitive searches.
pub fn query_terms(query: &str, options: &SearchOptions) -> Vec<String> {
    tokenizer::unique_terms(query, options.case_sensitive)
}

/// Score every candidate, drop non-matches, order and truncate.
pub fn rank(
    candidates: Vec<NoteRecord>,
    terms: &[String],
    options: &SearchOptions,
    ranking: &RankingConfig,
) -> Vec<SearchResult> {
    if terms.is_empty() {
        return Vec::new();
    }
    let analyzer = MatchAnalyzer::new(ranking);

    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .filter_map(|note| {
            let analysis = analyzer.analyze(&note, terms, options);
            if !analysis.is_match() || analysis.relevance_score <= 0.0 {
                return None;
            }
            Some(SearchResult {
                note,
                relevance_score: analysis.relevance_score,
                matched_terms: analysis.matched_terms,
                snippets: analysis.snippets,
                title_matches: analysis.title_matches,
                content_matches: analysis.content_matches,
            })
        })
        .collect();

    results.sort_by(compare_results);
    results.truncate(options.limit);
    results
}

/// Highest score first, then most recently modified, then id.
fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| b.note.modified_at.cmp(&a.note.modified_at))
        .then_with(|| a.note.id.cmp(&b.note.id))
}
