use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use bear_notes_search::{
    BearDatabase, Config, DateRange, NoteSearch, SearchField, SearchOptions, SimilarityOptions,
};

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Search, suggest and relate notes in a Bear database", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/bear-notes-search/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bear database file (overrides config and BEAR_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full-text search with relevance ranking
    Search {
        query: String,

        #[arg(short, long, default_value_t = bear_notes_search::types::DEFAULT_SEARCH_LIMIT)]
        limit: usize,

        /// Fields to search
        #[arg(long, value_enum, default_value_t = FieldArg::Both)]
        fields: FieldArg,

        /// Accept near-miss spellings
        #[arg(long)]
        fuzzy: bool,

        #[arg(long)]
        case_sensitive: bool,

        #[arg(long)]
        whole_word: bool,

        #[arg(long)]
        no_snippets: bool,

        #[arg(long)]
        include_trashed: bool,

        #[arg(long)]
        include_archived: bool,

        /// Only notes carrying at least one of these tags
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Created on or after this day (YYYY-MM-DD)
        #[arg(long)]
        created_after: Option<NaiveDate>,

        /// Created on or before this day (YYYY-MM-DD)
        #[arg(long)]
        created_before: Option<NaiveDate>,
    },

    /// Autocomplete terms, titles and tags for a prefix
    Suggest {
        prefix: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Notes similar to a piece of text
    Similar {
        text: String,

        #[arg(short, long, default_value_t = bear_notes_search::types::DEFAULT_SIMILAR_LIMIT)]
        limit: usize,

        #[arg(long)]
        min_similarity: Option<f64>,

        /// Note id to leave out of the results
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Notes related to a note, by tags and by content
    Related {
        note_id: String,

        #[arg(short, long, default_value_t = bear_notes_search::types::DEFAULT_SIMILAR_LIMIT)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FieldArg {
    Title,
    Content,
    Both,
}

impl FieldArg {
    fn to_fields(self) -> Vec<SearchField> {
        match self {
            FieldArg::Title => vec![SearchField::Title],
            FieldArg::Content => vec![SearchField::Content],
            FieldArg::Both => Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    bear_notes_search::init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }
    let timeout = Duration::from_secs(config.query_timeout_secs);
    let database = BearDatabase::from_config(&config)?;
    tracing::debug!(path = %database.path().display(), "Using Bear database");
    let engine = NoteSearch::with_ranking(database, config.ranking.clone());

    // SQLite access blocks; keep it off the async workers. On timeout the
    // blocking task is abandoned and whatever it produces is discarded.
    let command = cli.command;
    let output = tokio::time::timeout(
        timeout,
        tokio::task::spawn_blocking(move || run(&engine, command)),
    )
    .await
    .map_err(|_| anyhow!("Query timed out after {}s", timeout.as_secs()))?
    .context("Query task failed")??;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(engine: &NoteSearch<BearDatabase>, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Search {
            query,
            limit,
            fields,
            fuzzy,
            case_sensitive,
            whole_word,
            no_snippets,
            include_trashed,
            include_archived,
            tags,
            created_after,
            created_before,
        } => {
            let created = (created_after.is_some() || created_before.is_some()).then(|| DateRange {
                from: created_after.map(start_of_day),
                to: created_before.map(end_of_day),
            });
            let options = SearchOptions {
                limit,
                include_snippets: !no_snippets,
                fields: fields.to_fields(),
                fuzzy,
                case_sensitive,
                whole_word,
                include_trashed,
                include_archived,
                tags,
                created,
            };
            serde_json::to_value(engine.search(&query, &options)?)?
        }
        Commands::Suggest { prefix, limit } => serde_json::to_value(engine.suggest(&prefix, limit)?)?,
        Commands::Similar {
            text,
            limit,
            min_similarity,
            exclude,
        } => {
            let options = SimilarityOptions {
                limit,
                min_similarity,
                exclude_note_id: exclude,
                ..SimilarityOptions::default()
            };
            serde_json::to_value(engine.find_similar(&text, &options)?)?
        }
        Commands::Related { note_id, limit } => {
            serde_json::to_value(engine.related_notes(&note_id, limit)?)?
        }
    };
    Ok(value)
}

fn start_of_day(day: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

fn end_of_day(day: NaiveDate) -> chrono::DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default();
    Utc.from_utc_datetime(&day.and_time(last))
}
