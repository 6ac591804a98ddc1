use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "BEAR_DB_PATH";

const CONFIG_DIR_NAME: &str = "bear-notes-search";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bear SQLite file. Auto-detected when unset.
    pub database_path: Option<PathBuf>,
    /// Upper bound on notes fetched from the repository per call.
    pub max_candidates: usize,
    /// The CLI gives up on a call after this many seconds.
    pub query_timeout_secs: u64,
    pub ranking: RankingConfig,
    pub schema: BearSchema,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            max_candidates: 5000,
            query_timeout_secs: 10,
            ranking: RankingConfig::default(),
            schema: BearSchema::default(),
        }
    }
}

/// Knobs of the relevance and similarity scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub title_weight: f64,
    pub content_weight: f64,
    pub snippet_max_chars: usize,
    pub max_snippets: usize,
    pub signature_size: usize,
    pub default_min_similarity: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            title_weight: 3.0,
            content_weight: 1.0,
            snippet_max_chars: 160,
            max_snippets: 3,
            signature_size: 10,
            default_min_similarity: 0.1,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.title_weight > 0.0 && self.title_weight.is_finite()) {
            bail!("ranking.title_weight must be a positive number");
        }
        if !(self.content_weight > 0.0 && self.content_weight.is_finite()) {
            bail!("ranking.content_weight must be a positive number");
        }
        // Room for a few words plus both ellipses.
        if self.snippet_max_chars < 20 {
            bail!("ranking.snippet_max_chars must be at least 20");
        }
        if self.signature_size == 0 {
            bail!("ranking.signature_size must be greater than zero");
        }
        if !(self.default_min_similarity > 0.0 && self.default_min_similarity <= 1.0) {
            bail!("ranking.default_min_similarity must lie in (0, 1]");
        }
        Ok(())
    }
}

/// Bear stores the note/tag relation in a Core Data join table whose name
/// embeds entity numbers. They have shifted between Bear releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearSchema {
    pub note_tag_table: String,
    pub note_column: String,
    pub tag_column: String,
}

impl Default for BearSchema {
    fn default() -> Self {
        Self {
            note_tag_table: "Z_5TAGS".to_string(),
            note_column: "Z_5NOTES".to_string(),
            tag_column: "Z_13TAGS".to_string(),
        }
    }
}

impl BearSchema {
    /// Identifiers are spliced into SQL, so only plain names are accepted.
    pub fn validate(&self) -> Result<()> {
        for (key, ident) in [
            ("schema.note_tag_table", &self.note_tag_table),
            ("schema.note_column", &self.note_column),
            ("schema.tag_column", &self.tag_column),
        ] {
            let plain = !ident.is_empty()
                && ident.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
            if !plain {
                bail!("{key} must be a plain SQL identifier, got {ident:?}");
            }
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration.
    /// An explicit path must exist. Otherwise the per-user config file is
    /// used when present, falling back to defaults. `BEAR_DB_PATH` wins
    /// over the file's `database_path`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        if let Some(path) = std::env::var_os(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            bail!("max_candidates must be greater than zero");
        }
        if self.query_timeout_secs == 0 {
            bail!("query_timeout_secs must be greater than zero");
        }
        self.ranking.validate()?;
        self.schema.validate()?;
        Ok(())
    }

    /// Configured database path, or the auto-detected one.
    pub fn resolve_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::detect_bear_db_path)
    }
}

/// `<config_dir>/bear-notes-search/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
