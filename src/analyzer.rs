//! Per-note match analysis: occurrence counting, relevance scoring and
//! snippet extraction.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;
use crate::fuzzy;
use crate::types::{NoteRecord, SearchField, SearchOptions};

const ELLIPSIS: char = '\u{2026}';

/// How one note matched a set of query terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub relevance_score: f64,
    pub matched_terms: Vec<String>,
    pub snippets: Vec<String>,
    pub title_matches: usize,
    pub content_matches: usize,
}

impl MatchAnalysis {
    pub fn is_match(&self) -> bool {
        !self.matched_terms.is_empty()
    }
}

pub struct MatchAnalyzer<'a> {
    ranking: &'a RankingConfig,
}

impl<'a> MatchAnalyzer<'a> {
    pub fn new(ranking: &'a RankingConfig) -> Self {
        Self { ranking }
    }

    /// Score `note` against `terms`. Terms are expected in the casing the
    /// options call for (lowercase unless the search is case-sensitive).
    pub fn analyze(&self, note: &NoteRecord, terms: &[String], options: &SearchOptions) -> MatchAnalysis {
        let title = Folded::new(note.title(), options.case_sensitive);
        let body = Folded::new(note.body(), options.case_sensitive);
        let search_title = options.searches(SearchField::Title);
        let search_content = options.searches(SearchField::Content);

        let mut analysis = MatchAnalysis::default();
        // First body occurrence per matched term, as original byte ranges.
        let mut anchors: Vec<(usize, usize)> = Vec::new();

        for term in terms {
            let needles: Vec<String> = fuzzy::expand(term, options.fuzzy)
                .into_iter()
                .map(|v| if options.case_sensitive { v } else { v.to_lowercase() })
                .collect();

            let title_hits = if search_title {
                count_clusters(find_spans(&title.folded, &needles, options.whole_word))
            } else {
                0
            };

            let (content_hits, first) = if search_content {
                let spans = find_spans(&body.folded, &needles, options.whole_word);
                let first = spans.first().copied();
                (count_clusters(spans), first)
            } else {
                (0, None)
            };

            if title_hits + content_hits == 0 {
                continue;
            }
            analysis.matched_terms.push(term.clone());
            analysis.title_matches += title_hits;
            analysis.content_matches += content_hits;
            if let Some((start, end)) = first {
                anchors.push((body.to_original(start), body.to_original(end)));
            }
        }

        analysis.relevance_score = self.score(
            analysis.title_matches,
            analysis.content_matches,
            note.body().chars().count(),
        );

        if options.include_snippets && !anchors.is_empty() {
            analysis.snippets = self.snippets(note.body(), anchors);
        }
        analysis
    }

    /// Weighted match count, damped by the logarithm of the body length so
    /// long notes do not win on raw counts alone.
    pub fn score(&self, title_matches: usize, content_matches: usize, body_chars: usize) -> f64 {
        let weighted = self.ranking.title_weight * title_matches as f64
            + self.ranking.content_weight * content_matches as f64;
        if weighted == 0.0 {
            return 0.0;
        }
        let norm = ((body_chars + 1) as f64).ln().max(1.0);
        weighted / norm
    }

    fn snippets(&self, body: &str, mut anchors: Vec<(usize, usize)>) -> Vec<String> {
        anchors.sort_unstable();
        let mut windows: Vec<(usize, usize)> = Vec::new();
        let mut snippets = Vec::new();

        for (start, end) in anchors {
            if snippets.len() >= self.ranking.max_snippets {
                break;
            }
            let Some(snippet) = extract_snippet(body, start, end, self.ranking.snippet_max_chars) else {
                continue;
            };
            // Skip matches already visible in an earlier excerpt.
            let (char_start, char_end) = (char_index(body, start), char_index(body, end));
            if windows.iter().any(|(ws, we)| char_start >= *ws && char_end <= *we) {
                continue;
            }
            windows.push(snippet.window);
            if !snippets.contains(&snippet.text) {
                snippets.push(snippet.text);
            }
        }
        snippets
    }
}

/// Text with case folded, remembering where each folded byte came from.
struct Folded<'a> {
    folded: Cow<'a, str>,
    offsets: Option<Vec<usize>>,
}

impl<'a> Folded<'a> {
    fn new(text: &'a str, case_sensitive: bool) -> Self {
        if case_sensitive {
            return Self {
                folded: Cow::Borrowed(text),
                offsets: None,
            };
        }
        let mut folded = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        for (idx, ch) in text.char_indices() {
            for lower in ch.to_lowercase() {
                let before = folded.len();
                folded.push(lower);
                offsets.extend(std::iter::repeat(idx).take(folded.len() - before));
            }
        }
        offsets.push(text.len());
        Self {
            folded: Cow::Owned(folded),
            offsets: Some(offsets),
        }
    }

    fn to_original(&self, folded_idx: usize) -> usize {
        match &self.offsets {
            Some(offsets) => offsets[folded_idx.min(offsets.len() - 1)],
            None => folded_idx,
        }
    }
}

/// All occurrences of any needle, as byte spans sorted by position.
/// `needles[0]` is the query term itself; the rest are fuzzy variants and
/// only count where they form a whole word, optionally pluralised.
fn find_spans(haystack: &str, needles: &[String], whole_word: bool) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = needles
        .iter()
        .enumerate()
        .filter(|(_, n)| !n.is_empty())
        .flat_map(|(idx, needle)| {
            haystack
                .match_indices(needle.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .filter(|&(start, end)| {
                    if idx > 0 {
                        is_variant_bounded(haystack, start, end)
                    } else {
                        !whole_word || is_word_bounded(haystack, start, end)
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();
    spans.sort_unstable();
    spans
}

fn starts_word(haystack: &str, start: usize) -> bool {
    !haystack[..start].chars().next_back().is_some_and(char::is_alphanumeric)
}

fn ends_word(haystack: &str, end: usize) -> bool {
    !haystack[end..].chars().next().is_some_and(char::is_alphanumeric)
}

fn is_word_bounded(haystack: &str, start: usize, end: usize) -> bool {
    starts_word(haystack, start) && ends_word(haystack, end)
}

fn is_variant_bounded(haystack: &str, start: usize, end: usize) -> bool {
    if !starts_word(haystack, start) {
        return false;
    }
    ["", "s", "es"]
        .iter()
        .any(|suffix| haystack[end..].starts_with(suffix) && ends_word(haystack, end + suffix.len()))
}

/// Overlapping spans (a term and its variant at one spot) count once.
fn count_clusters(spans: Vec<(usize, usize)>) -> usize {
    let mut count = 0;
    let mut cluster_end = 0;
    for (start, end) in spans {
        if count == 0 || start >= cluster_end {
            count += 1;
            cluster_end = end;
        } else {
            cluster_end = cluster_end.max(end);
        }
    }
    count
}

fn char_index(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx.min(text.len())].chars().count()
}

struct Snippet {
    text: String,
    /// Char range of the body the snippet covers.
    window: (usize, usize),
}

/// Excerpt of at most `max_chars` characters around the byte range
/// `start..end`, cut at whitespace and marked with an ellipsis on each
/// truncated side. Whitespace runs collapse to single spaces.
fn extract_snippet(body: &str, start: usize, end: usize, max_chars: usize) -> Option<Snippet> {
    if !body.is_char_boundary(start) || !body.is_char_boundary(end) || start >= end {
        return None;
    }
    let chars: Vec<char> = body.chars().collect();
    let total = chars.len();
    let m_start = char_index(body, start);
    let m_end = char_index(body, end);
    let budget = max_chars.saturating_sub(2).max(1);

    let (mut from, mut to) = if m_end - m_start >= budget {
        (m_start, m_start + budget)
    } else {
        let remaining = budget - (m_end - m_start);
        let mut before = (remaining / 2).min(m_start);
        let after = (remaining - before).min(total - m_end);
        before = (remaining - after).min(m_start);
        (m_start - before, m_end + after)
    };

    if from > 0 && !chars[from - 1].is_whitespace() {
        if let Some(k) = (from..m_start).find(|&i| chars[i].is_whitespace()) {
            from = k + 1;
        }
    }
    if to < total && !chars[to].is_whitespace() {
        if let Some(k) = (m_end..to).rev().find(|&i| chars[i].is_whitespace()) {
            to = k;
        }
    }

    let excerpt: String = chars[from..to].iter().collect();
    let mut text = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    if from > 0 {
        text.insert(0, ELLIPSIS);
    }
    if to < total {
        text.push(ELLIPSIS);
    }
    Some(Snippet {
        text,
        window: (from, to),
    })
}
