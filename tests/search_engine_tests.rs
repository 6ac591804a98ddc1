//! Behaviour of the caller-facing operations over an in-memory corpus.

use std::cell::Cell;

use anyhow::anyhow;
use bear_notes_search::tokenizer::tokenize;
use bear_notes_search::{
    CandidateFilter, MemoryRepository, NoteRecord, NoteRepository, NoteSearch, SearchError,
    SearchOptions, SimilarityOptions,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn note(id: &str, title: &str, body: &str, tags: &[&str], age_days: i64) -> NoteRecord {
    NoteRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        body: Some(body.to_string()),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        trashed: false,
        archived: false,
        pinned: false,
        encrypted: false,
        created_at: base_time() - Duration::days(age_days + 1),
        modified_at: base_time() - Duration::days(age_days),
    }
}

fn corpus() -> Vec<NoteRecord> {
    let mut trashed = note("T", "Project graveyard", "old project ideas", &["project"], 0);
    trashed.trashed = true;
    let mut archived = note("A", "Archived project", "project from last year", &["projects"], 0);
    archived.archived = true;

    vec![
        note("P1", "Project Plan", "This covers the project timeline", &["project", "work"], 2),
        note("U1", "Unrelated", "Nothing related", &["home"], 1),
        note(
            "M1",
            "Team meeting",
            "Team collaboration notes: planning the roadmap, hiring plan and budget review.",
            &["work", "meetings"],
            3,
        ),
        note(
            "M2",
            "Weekly sync",
            "Roadmap review with the team. Budget planning continues next week.",
            &["work"],
            4,
        ),
        note("R1", "Recipes", "Tomato soup with basil and garlic bread.", &["home", "cooking"], 5),
        trashed,
        archived,
    ]
}

fn engine() -> NoteSearch<MemoryRepository> {
    NoteSearch::new(MemoryRepository::new(corpus()))
}

fn ids<T>(items: &[T], id: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|i| id(i).to_string()).collect()
}

/// Repository that always fails and counts how often it was asked.
#[derive(Default)]
struct BrokenRepository {
    calls: Cell<usize>,
}

impl NoteRepository for BrokenRepository {
    fn fetch_candidates(&self, _filter: &CandidateFilter) -> anyhow::Result<Vec<NoteRecord>> {
        self.calls.set(self.calls.get() + 1);
        Err(anyhow!("database is locked"))
    }

    fn fetch_note(&self, _id: &str) -> anyhow::Result<Option<NoteRecord>> {
        self.calls.set(self.calls.get() + 1);
        Err(anyhow!("database is locked"))
    }
}

mod search_tests {
    use super::*;

    #[test]
    fn test_project_query_scenario() {
        let results = engine().search("project", &SearchOptions::default()).unwrap();

        assert_eq!(ids(&results, |r| r.note.id.as_str()), vec!["P1"]);
        assert!(results[0].title_matches >= 1);
        assert!(results[0].content_matches >= 1);
        assert_eq!(results[0].matched_terms, vec!["project"]);
        assert!(!results[0].snippets.is_empty());
    }

    #[test]
    fn test_empty_and_stopword_queries_return_nothing() {
        let engine = engine();
        assert!(engine.search("", &SearchOptions::default()).unwrap().is_empty());
        assert!(engine.search("   \t", &SearchOptions::default()).unwrap().is_empty());
        assert!(engine.search("the and of", &SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_query_does_not_touch_repository() {
        let broken = BrokenRepository::default();
        let engine = NoteSearch::new(&broken);
        assert!(engine.search("  ", &SearchOptions::default()).unwrap().is_empty());
        assert_eq!(broken.calls.get(), 0);
    }

    #[test]
    fn test_results_sorted_and_limited() {
        let engine = engine();
        let opts = SearchOptions {
            limit: 2,
            ..SearchOptions::default()
        };
        let results = engine.search("team roadmap budget planning", &opts).unwrap();
        assert!(results.len() <= 2);
        for pair in results.windows(2) {
            assert!(pair[0].relevance_score >= pair[1].relevance_score);
        }
        for r in &results {
            assert!(!r.matched_terms.is_empty());
            assert!(r.relevance_score > 0.0);
        }
    }

    #[test]
    fn test_matched_terms_are_query_terms() {
        let results = engine()
            .search("roadmap budget spaceship", &SearchOptions::default())
            .unwrap();
        assert!(!results.is_empty());
        for r in &results {
            for term in &r.matched_terms {
                assert!(["roadmap", "budget"].contains(&term.as_str()));
            }
        }
    }

    #[test]
    fn test_trashed_and_archived_inclusion() {
        let engine = engine();
        let default = engine.search("project", &SearchOptions::default()).unwrap();
        assert_eq!(default.len(), 1);

        let opts = SearchOptions {
            include_trashed: true,
            include_archived: true,
            ..SearchOptions::default()
        };
        let mut found = ids(&engine.search("project", &opts).unwrap(), |r| r.note.id.as_str());
        found.sort();
        assert_eq!(found, vec!["A", "P1", "T"]);
    }

    #[test]
    fn test_tag_filter() {
        let opts = SearchOptions {
            tags: vec!["meetings".to_string()],
            ..SearchOptions::default()
        };
        let results = engine().search("roadmap", &opts).unwrap();
        assert_eq!(ids(&results, |r| r.note.id.as_str()), vec!["M1"]);
    }

    #[test]
    fn test_fuzzy_search_catches_misspelling() {
        let engine = engine();
        assert!(engine.search("porject", &SearchOptions::default()).unwrap().is_empty());

        let opts = SearchOptions {
            fuzzy: true,
            ..SearchOptions::default()
        };
        let results = engine.search("porject", &opts).unwrap();
        assert_eq!(ids(&results, |r| r.note.id.as_str()), vec!["P1"]);
        assert_eq!(results[0].matched_terms, vec!["porject"]);
    }

    #[test]
    fn test_fuzzy_search_ignores_words_containing_variants() {
        let repo = MemoryRepository::new(vec![
            note("a", "Intro", "a short explanation", &[], 1),
            note("b", "Roadmap", "our platform roadmap", &[], 2),
            note("c", "Standup", "every participant joined", &[], 3),
            note("d", "Garden", "the plant needs water", &[], 4),
        ]);
        let opts = SearchOptions {
            fuzzy: true,
            ..SearchOptions::default()
        };
        let results = NoteSearch::new(repo).search("plant", &opts).unwrap();
        assert_eq!(ids(&results, |r| r.note.id.as_str()), vec!["d"]);
    }

    #[test]
    fn test_snippet_round_trip() {
        let engine = engine();
        let results = engine.search("roadmap", &SearchOptions::default()).unwrap();
        assert!(!results.is_empty());

        for result in &results {
            for snippet in &result.snippets {
                let terms = tokenize(snippet);
                let term = result
                    .matched_terms
                    .iter()
                    .find(|t| terms.iter().any(|s| s.contains(t.as_str())))
                    .expect("snippet holds a matched term");
                let again = engine.search(term, &SearchOptions::default()).unwrap();
                assert!(again.iter().any(|r| r.note.id == result.note.id));
            }
        }
    }

    #[test]
    fn test_invalid_options_rejected_before_fetch() {
        let broken = BrokenRepository::default();
        let engine = NoteSearch::new(&broken);
        let opts = SearchOptions {
            limit: 0,
            ..SearchOptions::default()
        };
        let err = engine.search("project", &opts).unwrap_err();
        assert_eq!(err.field(), Some("limit"));
        assert_eq!(broken.calls.get(), 0);
    }

    #[test]
    fn test_repository_failure_is_wrapped() {
        let broken = BrokenRepository::default();
        let engine = NoteSearch::new(&broken);
        let err = engine.search("project", &SearchOptions::default()).unwrap_err();
        match err {
            SearchError::Repository { operation, message } => {
                assert_eq!(operation, "search");
                assert!(message.contains("database is locked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(broken.calls.get(), 1);
    }
}

mod suggest_tests {
    use super::*;

    #[test]
    fn test_proj_scenario() {
        let bundle = engine().suggest("proj", 5).unwrap();
        // Archived and trashed notes are not suggestion sources.
        assert_eq!(bundle.tags, vec!["project"]);
        assert_eq!(bundle.titles, vec!["Project Plan"]);
        assert_eq!(bundle.terms, vec!["project"]);
    }

    #[test]
    fn test_tags_both_forms() {
        let repo = MemoryRepository::new(vec![
            note("1", "Project Plan", "timeline", &["project"], 1),
            note("2", "Other", "text", &["projects"], 2),
        ]);
        let bundle = NoteSearch::new(repo).suggest("Proj", 5).unwrap();
        assert_eq!(bundle.tags, vec!["project", "projects"]);
        assert_eq!(bundle.titles, vec!["Project Plan"]);
    }

    #[test]
    fn test_short_prefix_executes() {
        let bundle = engine().suggest("t", 3).unwrap();
        assert!(bundle.terms.len() <= 3);
        assert!(bundle.terms.iter().all(|t| t.starts_with('t')));
        assert!(!bundle.titles.is_empty());
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert_eq!(engine().suggest("proj", 0).unwrap_err().field(), Some("limit"));
    }

    #[test]
    fn test_blank_prefix_is_empty() {
        assert!(engine().suggest("  ", 5).unwrap().is_empty());
    }
}

mod similarity_tests {
    use super::*;

    #[test]
    fn test_no_close_match_returns_empty() {
        let opts = SimilarityOptions {
            min_similarity: Some(0.9),
            ..SimilarityOptions::default()
        };
        let results = engine()
            .find_similar("team collaboration and planning", &opts)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_finds_overlapping_notes_and_excludes_id() {
        let engine = engine();
        let text = "Team collaboration notes: planning the roadmap, hiring plan and budget review.";
        let all = engine.find_similar(text, &SimilarityOptions::default()).unwrap();
        assert_eq!(all[0].note.id, "M1");
        // The note's title adds one keyword the body alone lacks.
        assert!((all[0].similarity_score - 0.9).abs() < 1e-9);

        let opts = SimilarityOptions {
            exclude_note_id: Some("M1".to_string()),
            ..SimilarityOptions::default()
        };
        let results = engine.find_similar(text, &opts).unwrap();
        assert!(results.iter().all(|r| r.note.id != "M1"));
        assert_eq!(results[0].note.id, "M2");
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        for r in &results {
            assert!(r.similarity_score > 0.0 && r.similarity_score <= 1.0);
            assert!(!r.common_keywords.is_empty());
        }
    }

    #[test]
    fn test_reference_without_keywords() {
        let results = engine()
            .find_similar("it is what it is", &SimilarityOptions::default())
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_threshold() {
        let opts = SimilarityOptions {
            min_similarity: Some(-0.5),
            ..SimilarityOptions::default()
        };
        let err = engine().find_similar("roadmap", &opts).unwrap_err();
        assert_eq!(err.field(), Some("min_similarity"));
    }

    #[test]
    fn test_related_notes_keeps_signals_apart() {
        let related = engine().related_notes("M1", 10).unwrap();

        let by_tags = ids(&related.by_tags, |r| r.note.id.as_str());
        assert_eq!(by_tags, vec!["P1", "M2"]);
        assert!(related.by_tags.iter().all(|r| r.shared_tags == vec!["work"]));

        let by_content = ids(&related.by_content, |r| r.note.id.as_str());
        assert!(!by_content.contains(&"M1".to_string()));
        assert_eq!(by_content.first().map(String::as_str), Some("M2"));
    }

    #[test]
    fn test_related_notes_unknown_id() {
        let err = engine().related_notes("missing", 5).unwrap_err();
        assert_eq!(
            err,
            SearchError::NoteNotFound {
                id: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_related_notes_repository_failure() {
        let broken = BrokenRepository::default();
        let err = NoteSearch::new(&broken).related_notes("M1", 5).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Repository {
                operation: "related_notes",
                ..
            }
        ));
    }
}
