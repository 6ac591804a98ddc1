use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of results returned by `search`.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Default number of results returned by `find_similar` and `related_notes`.
pub const DEFAULT_SIMILAR_LIMIT: usize = 10;

/// A note as handed over by the note repository. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String, // Bear ZUNIQUEIDENTIFIER
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub trashed: bool,
    pub archived: bool,
    pub pinned: bool,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl NoteRecord {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }

    /// Title and body joined, used wherever the note is treated as one text.
    pub fn full_text(&self) -> String {
        match (self.title.as_deref(), self.body.as_deref()) {
            (Some(t), Some(b)) => format!("{t}\n\n{b}"),
            (Some(t), None) => t.to_string(),
            (None, Some(b)) => b.to_string(),
            (None, None) => String::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = fold_tag(tag);
        self.tags.iter().any(|t| fold_tag(t) == wanted)
    }
}

/// Canonical form used whenever tag names are compared: trimmed and
/// lowercased with full Unicode rules.
pub fn fold_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Which note fields a full-text query looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Content,
}

/// Inclusive creation-date range. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| instant >= from) && self.to.map_or(true, |to| instant <= to)
    }

    pub fn is_valid(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub limit: usize,
    pub include_snippets: bool,
    /// Empty means both title and content.
    pub fields: Vec<SearchField>,
    pub fuzzy: bool,
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub include_trashed: bool,
    pub include_archived: bool,
    /// A note must carry at least one of these tags.
    pub tags: Vec<String>,
    pub created: Option<DateRange>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            include_snippets: true,
            fields: Vec::new(),
            fuzzy: false,
            case_sensitive: false,
            whole_word: false,
            include_trashed: false,
            include_archived: false,
            tags: Vec::new(),
            created: None,
        }
    }
}

impl SearchOptions {
    pub fn searches(&self, field: SearchField) -> bool {
        self.fields.is_empty() || self.fields.contains(&field)
    }

    /// Structural part of the options, evaluated by the repository.
    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter {
            include_trashed: self.include_trashed,
            include_archived: self.include_archived,
            tags: self.tags.iter().map(|t| fold_tag(t)).collect(),
            created: self.created.unwrap_or_default(),
        }
    }
}

/// Filter passed to `NoteRepository::fetch_candidates`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub include_trashed: bool,
    pub include_archived: bool,
    pub tags: Vec<String>,
    pub created: DateRange,
}

impl CandidateFilter {
    /// Whether a note passes this filter. Repositories that hold notes in
    /// memory use this directly; SQL-backed ones translate it into a query.
    pub fn matches(&self, note: &NoteRecord) -> bool {
        (self.include_trashed || !note.trashed)
            && (self.include_archived || !note.archived)
            && (self.tags.is_empty() || self.tags.iter().any(|t| note.has_tag(t)))
            && self.created.contains(note.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub note: NoteRecord,
    pub relevance_score: f64,
    /// Query terms (never fuzzy variants) found in the note, in query order.
    pub matched_terms: Vec<String>,
    pub snippets: Vec<String>,
    pub title_matches: usize,
    pub content_matches: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityOptions {
    pub limit: usize,
    /// Results scoring below this are dropped. `None` uses the configured default.
    pub min_similarity: Option<f64>,
    pub exclude_note_id: Option<String>,
    pub include_trashed: bool,
    pub include_archived: bool,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SIMILAR_LIMIT,
            min_similarity: None,
            exclude_note_id: None,
            include_trashed: false,
            include_archived: false,
        }
    }
}

impl SimilarityOptions {
    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter {
            include_trashed: self.include_trashed,
            include_archived: self.include_archived,
            ..CandidateFilter::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub note: NoteRecord,
    /// Jaccard overlap of keyword signatures, in [0, 1].
    pub similarity_score: f64,
    /// Shared signature terms, in the reference signature's order.
    pub common_keywords: Vec<String>,
}

/// The most frequent terms of a text, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSignature {
    pub terms: Vec<String>,
}

impl KeywordSignature {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionBundle {
    pub terms: Vec<String>,
    pub titles: Vec<String>,
    pub tags: Vec<String>,
}

impl SuggestionBundle {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.titles.is_empty() && self.tags.is_empty()
    }
}

/// A note sharing at least one tag with the reference note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRelatedNote {
    pub note: NoteRecord,
    pub shared_tags: Vec<String>,
}

/// Explicit (tag) and implicit (content) relations are kept apart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelatedNotes {
    pub by_tags: Vec<TagRelatedNote>,
    pub by_content: Vec<SimilarityResult>,
}
