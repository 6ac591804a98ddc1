use std::time::Instant;

use crate::config::RankingConfig;
use crate::error::{SearchError, SearchOutcome};
use crate::repository::NoteRepository;
use crate::search;
use crate::similarity;
use crate::suggest;
use crate::types::{
    CandidateFilter, NoteRecord, RelatedNotes, SearchOptions, SearchResult, SimilarityOptions,
    SimilarityResult, SuggestionBundle,
};

/// The caller-facing operations: full-text search, suggestions, similar
/// and related notes.
///
/// Holds no state between calls. Every operation fetches a fresh candidate
/// set from the repository and ranks it locally, so a shared instance can
/// serve concurrent requests.
pub struct NoteSearch<R> {
    repository: R,
    ranking: RankingConfig,
}

impl<R: NoteRepository> NoteSearch<R> {
    pub fn new(repository: R) -> Self {
        Self::with_ranking(repository, RankingConfig::default())
    }

    pub fn with_ranking(repository: R, ranking: RankingConfig) -> Self {
        Self { repository, ranking }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn ranking(&self) -> &RankingConfig {
        &self.ranking
    }

    /// Notes matching `query`, best first, at most `options.limit` of them.
    /// A query without usable terms yields no results.
    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchOutcome<Vec<SearchResult>> {
        search::validate_options(options)?;
        let terms = search::query_terms(query, options);
        if terms.is_empty() {
            tracing::debug!("search: query has no usable terms");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let candidates = self.fetch("search", &options.candidate_filter())?;
        let candidate_count = candidates.len();
        let results = search::rank(candidates, &terms, options, &self.ranking);

        tracing::debug!(
            terms = terms.len(),
            candidates = candidate_count,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(results)
    }

    /// Autocomplete terms, titles and tags for a partial query.
    pub fn suggest(&self, partial_query: &str, limit: usize) -> SearchOutcome<SuggestionBundle> {
        if limit == 0 {
            return Err(SearchError::invalid("limit", "must be greater than zero"));
        }
        let prefix = suggest::normalize_prefix(partial_query);
        if prefix.is_empty() {
            return Ok(SuggestionBundle::default());
        }

        let started = Instant::now();
        let candidates = self.fetch("suggest", &CandidateFilter::default())?;
        let bundle = suggest::build(&candidates, &prefix, limit);

        tracing::debug!(
            candidates = candidates.len(),
            terms = bundle.terms.len(),
            titles = bundle.titles.len(),
            tags = bundle.tags.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "suggest finished"
        );
        Ok(bundle)
    }

    /// Notes whose keyword signature overlaps that of `reference_text`.
    pub fn find_similar(
        &self,
        reference_text: &str,
        options: &SimilarityOptions,
    ) -> SearchOutcome<Vec<SimilarityResult>> {
        let min_similarity = similarity::validate_options(options, self.ranking.default_min_similarity)?;
        let reference = similarity::keyword_signature(reference_text, self.ranking.signature_size);
        if reference.is_empty() {
            tracing::debug!("find_similar: reference text has no keywords");
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let candidates = self.fetch("find_similar", &options.candidate_filter())?;
        let candidate_count = candidates.len();
        let results = similarity::rank_similar(
            &reference,
            candidates,
            options,
            min_similarity,
            self.ranking.signature_size,
        );

        tracing::debug!(
            candidates = candidate_count,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "find_similar finished"
        );
        Ok(results)
    }

    /// Notes related to `note_id`, by shared tags and by content, as two
    /// separate rankings.
    pub fn related_notes(&self, note_id: &str, limit: usize) -> SearchOutcome<RelatedNotes> {
        if limit == 0 {
            return Err(SearchError::invalid("limit", "must be greater than zero"));
        }
        if note_id.trim().is_empty() {
            return Err(SearchError::invalid("note_id", "must not be empty"));
        }

        let started = Instant::now();
        let reference = self.fetch_reference(note_id)?;
        let candidates = self.fetch("related_notes", &CandidateFilter::default())?;
        let candidate_count = candidates.len();

        let by_tags = similarity::rank_by_tags(&reference, &candidates, limit);
        let signature = similarity::keyword_signature(&reference.full_text(), self.ranking.signature_size);
        let content_options = SimilarityOptions {
            limit,
            exclude_note_id: Some(reference.id.clone()),
            ..SimilarityOptions::default()
        };
        let by_content = similarity::rank_similar(
            &signature,
            candidates,
            &content_options,
            self.ranking.default_min_similarity,
            self.ranking.signature_size,
        );

        tracing::debug!(
            candidates = candidate_count,
            by_tags = by_tags.len(),
            by_content = by_content.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "related_notes finished"
        );
        Ok(RelatedNotes { by_tags, by_content })
    }

    fn fetch(&self, operation: &'static str, filter: &CandidateFilter) -> SearchOutcome<Vec<NoteRecord>> {
        self.repository.fetch_candidates(filter).map_err(|e| {
            tracing::warn!(operation, "note repository failed: {e:#}");
            SearchError::repository(operation, e)
        })
    }

    fn fetch_reference(&self, note_id: &str) -> SearchOutcome<NoteRecord> {
        self.repository
            .fetch_note(note_id)
            .map_err(|e| {
                tracing::warn!(operation = "related_notes", "note repository failed: {e:#}");
                SearchError::repository("related_notes", e)
            })?
            .ok_or_else(|| SearchError::NoteNotFound {
                id: note_id.to_string(),
            })
    }
}
