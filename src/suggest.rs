//! Autocomplete candidates for a partially typed query.

use std::collections::{HashMap, HashSet};

use crate::tokenizer;
use crate::types::{fold_tag, NoteRecord, SuggestionBundle};

/// Case-insensitive prefix form of a partial query.
pub fn normalize_prefix(partial: &str) -> String {
    partial.trim().to_lowercase()
}

/// Build the three suggestion lists for `prefix` (already normalised).
/// Each list is deduplicated case-insensitively and capped at `limit`.
pub fn build(candidates: &[NoteRecord], prefix: &str, limit: usize) -> SuggestionBundle {
    if prefix.is_empty() || limit == 0 {
        return SuggestionBundle::default();
    }
    SuggestionBundle {
        terms: matching_terms(candidates, prefix, limit),
        titles: matching_titles(candidates, prefix, limit),
        tags: matching_tags(candidates, prefix, limit),
    }
}

/// Body terms starting with `prefix`, most frequent across the corpus first.
fn matching_terms(candidates: &[NoteRecord], prefix: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for note in candidates {
        for term in tokenizer::tokenize(note.body()) {
            if term.starts_with(prefix) {
                *counts.entry(term).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(term, _)| term).collect()
}

/// Titles with a word starting with `prefix`, most recently modified first.
fn matching_titles(candidates: &[NoteRecord], prefix: &str, limit: usize) -> Vec<String> {
    let mut notes: Vec<&NoteRecord> = candidates
        .iter()
        .filter(|n| title_has_word_prefix(n.title(), prefix))
        .collect();
    notes.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut seen = HashSet::new();
    notes
        .into_iter()
        .map(|n| n.title().trim().to_string())
        .filter(|title| seen.insert(title.to_lowercase()))
        .take(limit)
        .collect()
}

fn title_has_word_prefix(title: &str, prefix: &str) -> bool {
    let lower = title.to_lowercase();
    lower.match_indices(prefix).any(|(start, _)| {
        !lower[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric)
    })
}

/// Tags starting with `prefix`, most used first.
fn matching_tags(candidates: &[NoteRecord], prefix: &str, limit: usize) -> Vec<String> {
    // lowercase name -> (first spelling seen, usage count)
    let mut usage: HashMap<String, (String, usize)> = HashMap::new();
    for note in candidates {
        let mut on_note = HashSet::new();
        for tag in &note.tags {
            let key = fold_tag(tag);
            if key.is_empty() || !key.starts_with(prefix) || !on_note.insert(key.clone()) {
                continue;
            }
            usage
                .entry(key)
                .or_insert_with(|| (tag.trim().to_string(), 0))
                .1 += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = usage.into_values().collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
    });
    ranked.into_iter().take(limit).map(|(tag, _)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn note(id: &str, title: &str, body: &str, tags: &[&str], age_days: i64) -> NoteRecord {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        NoteRecord {
            id: id.to_string(),
            title: Some(title.to_string()),
            body: Some(body.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            trashed: false,
            archived: false,
            pinned: false,
            encrypted: false,
            created_at: now,
            modified_at: now - Duration::days(age_days),
        }
    }

    fn corpus() -> Vec<NoteRecord> {
        vec![
            note("1", "Project Plan", "project timeline and projection", &["project", "work"], 3),
            note("2", "Old project notes", "projects projects project", &["projects"], 10),
            note("3", "Reprojection math", "math only", &["Project"], 1),
            note("4", "project plan", "duplicate title", &["misc"], 5),
        ]
    }

    #[test]
    fn test_terms_ranked_by_frequency() {
        let bundle = build(&corpus(), "proj", 5);
        assert_eq!(bundle.terms, vec!["project", "projects", "projection"]);
    }

    #[test]
    fn test_titles_word_boundary_recency_dedup() {
        let bundle = build(&corpus(), "proj", 5);
        // "Reprojection" only contains the prefix mid-word.
        assert_eq!(bundle.titles, vec!["Project Plan", "Old project notes"]);
    }

    #[test]
    fn test_tags_ranked_by_usage_case_insensitive() {
        let bundle = build(&corpus(), "proj", 5);
        assert_eq!(bundle.tags, vec!["project", "projects"]);
    }

    #[test]
    fn test_limit_caps_each_list() {
        let bundle = build(&corpus(), "proj", 1);
        assert_eq!(bundle.terms.len(), 1);
        assert_eq!(bundle.titles.len(), 1);
        assert_eq!(bundle.tags.len(), 1);
    }

    #[test]
    fn test_single_char_prefix_still_runs() {
        let bundle = build(&corpus(), "w", 5);
        assert_eq!(bundle.tags, vec!["work"]);
    }

    #[test]
    fn test_empty_prefix() {
        assert!(build(&corpus(), "", 5).is_empty());
        assert_eq!(normalize_prefix("  PrOj "), "proj");
    }
}
