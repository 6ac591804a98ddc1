use anyhow::Result;

use crate::types::{CandidateFilter, NoteRecord};

/// Source of candidate notes. Implementations apply the structural filter
/// themselves and return a finite, already-filtered set.
pub trait NoteRepository {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<NoteRecord>>;

    /// A single note by id, regardless of trashed/archived state.
    fn fetch_note(&self, id: &str) -> Result<Option<NoteRecord>>;
}

impl<R: NoteRepository + ?Sized> NoteRepository for &R {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<NoteRecord>> {
        (**self).fetch_candidates(filter)
    }

    fn fetch_note(&self, id: &str) -> Result<Option<NoteRecord>> {
        (**self).fetch_note(id)
    }
}

impl<R: NoteRepository + ?Sized> NoteRepository for std::sync::Arc<R> {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<NoteRecord>> {
        (**self).fetch_candidates(filter)
    }

    fn fetch_note(&self, id: &str) -> Result<Option<NoteRecord>> {
        (**self).fetch_note(id)
    }
}

/// Notes held in memory, e.g. a snapshot taken by the host.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    notes: Vec<NoteRecord>,
    max_candidates: Option<usize>,
}

impl MemoryRepository {
    pub fn new(notes: Vec<NoteRecord>) -> Self {
        Self {
            notes,
            max_candidates: None,
        }
    }

    /// Cap the number of notes returned per fetch, most recent kept.
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = Some(max);
        self
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteRepository for MemoryRepository {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<NoteRecord>> {
        let mut notes: Vec<NoteRecord> = self
            .notes
            .iter()
            .filter(|n| filter.matches(n))
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        if let Some(max) = self.max_candidates {
            notes.truncate(max);
        }
        Ok(notes)
    }

    fn fetch_note(&self, id: &str) -> Result<Option<NoteRecord>> {
        Ok(self.notes.iter().find(|n| n.id == id).cloned())
    }
}
