pub mod analyzer;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod fuzzy;
pub mod repository;
pub mod search;
pub mod similarity;
pub mod suggest;
pub mod tokenizer;
pub mod types;

pub use crate::config::{BearSchema, Config, RankingConfig};
pub use crate::db::BearDatabase;
pub use crate::engine::NoteSearch;
pub use crate::error::{SearchError, SearchOutcome};
pub use crate::repository::{MemoryRepository, NoteRepository};
pub use crate::types::{
    CandidateFilter, DateRange, KeywordSignature, NoteRecord, RelatedNotes, SearchField,
    SearchOptions, SearchResult, SimilarityOptions, SimilarityResult, SuggestionBundle,
    TagRelatedNote,
};

/// Install the global tracing subscriber.
/// Release builds only log WARN and above to avoid leaking note content;
/// debug builds honour `RUST_LOG` and default to `info`.
pub fn init_tracing() {
    #[cfg(debug_assertions)]
    {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
