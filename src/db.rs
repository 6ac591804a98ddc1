use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, Row};

use crate::config::{BearSchema, Config};
use crate::repository::NoteRepository;
use crate::types::{fold_tag, CandidateFilter, NoteRecord};

/// Core Data stores instants as seconds since 2001-01-01T00:00:00Z.
const CORE_DATA_EPOCH_UNIX: f64 = 978_307_200.0;

/// Note keys per tag query; SQLite caps bound parameters per statement.
const TAG_QUERY_CHUNK: usize = 500;

const NOTE_COLUMNS: &str = "n.Z_PK, n.ZUNIQUEIDENTIFIER, n.ZTITLE, n.ZTEXT,
       n.ZTRASHED, n.ZARCHIVED, n.ZPINNED, n.ZENCRYPTED,
       n.ZCREATIONDATE, n.ZMODIFICATIONDATE";

/// Auto-detect the Bear SQLite database path.
/// Falls back to None if not found; the caller should then ask for an explicit path.
pub fn detect_bear_db_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let path = home
        .join("Library")
        .join("Group Containers")
        .join("9K33E3U3T4.net.shinyfrog.bear")
        .join("Application Data")
        .join("database.sqlite");
    path.exists().then_some(path)
}

/// Open the Bear SQLite database in read-only mode.
/// The desktop app owns the file, so nothing here may write to it,
/// pragmas included.
pub fn open_bear_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open Bear database at {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA query_only = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

pub fn core_data_to_utc(seconds: f64) -> DateTime<Utc> {
    let millis = ((seconds + CORE_DATA_EPOCH_UNIX) * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

pub fn utc_to_core_data(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 1000.0 - CORE_DATA_EPOCH_UNIX
}

/// Note repository backed by Bear's SQLite file. A fresh read-only
/// connection is opened per call, so the value is cheap to share.
#[derive(Debug, Clone)]
pub struct BearDatabase {
    path: PathBuf,
    schema: BearSchema,
    max_candidates: usize,
}

impl BearDatabase {
    pub fn new(path: impl Into<PathBuf>, schema: BearSchema, max_candidates: usize) -> Self {
        Self {
            path: path.into(),
            schema,
            max_candidates,
        }
    }

    /// Build from configuration, auto-detecting the path when unset.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.resolve_database_path().context(
            "Bear database not found; set database_path in the config file or BEAR_DB_PATH",
        )?;
        Ok(Self::new(path, config.schema.clone(), config.max_candidates))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn join_clause(&self) -> String {
        format!(
            "{table} nt JOIN ZSFNOTETAG t ON t.Z_PK = nt.{tag}",
            table = self.schema.note_tag_table,
            tag = self.schema.tag_column,
        )
    }

    /// Tag names for the given note primary keys, queried in chunks to
    /// stay under SQLite's bound-parameter limit.
    fn load_tags(&self, conn: &Connection, note_pks: &[i64]) -> Result<HashMap<i64, Vec<String>>> {
        let mut tags: HashMap<i64, Vec<String>> = HashMap::new();
        for chunk in note_pks.chunks(TAG_QUERY_CHUNK) {
            let sql = format!(
                "SELECT nt.{note}, t.ZTITLE FROM {join}
                 WHERE t.ZTITLE IS NOT NULL AND nt.{note} IN ({placeholders})
                 ORDER BY t.ZTITLE",
                note = self.schema.note_column,
                join = self.join_clause(),
                placeholders = vec!["?"; chunk.len()].join(", "),
            );
            let mut stmt = conn.prepare(&sql).context("Failed to prepare tag query")?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                match row {
                    Ok((pk, tag)) => tags.entry(pk).or_default().push(tag),
                    Err(e) => tracing::warn!("Skipping malformed tag row: {e}"),
                }
            }
        }
        Ok(tags)
    }

    /// Primary keys of tags whose name folds to one of `wanted`.
    /// SQLite's `lower()` only folds ASCII, so names are compared here.
    fn matching_tag_pks(&self, conn: &Connection, wanted: &[String]) -> Result<Vec<i64>> {
        let wanted: HashSet<String> = wanted.iter().map(|t| fold_tag(t)).collect();
        let mut stmt = conn
            .prepare("SELECT Z_PK, ZTITLE FROM ZSFNOTETAG WHERE ZTITLE IS NOT NULL")
            .context("Failed to prepare tag name query")?;
        let pks = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .context("Failed to query ZSFNOTETAG")?
            .filter_map(|r| {
                r.map_err(|e| tracing::warn!("Skipping malformed tag row: {e}"))
                    .ok()
            })
            .filter(|(_, name)| wanted.contains(&fold_tag(name)))
            .map(|(pk, _)| pk)
            .collect();
        Ok(pks)
    }
}

impl NoteRepository for BearDatabase {
    fn fetch_candidates(&self, filter: &CandidateFilter) -> Result<Vec<NoteRecord>> {
        let conn = open_bear_db(&self.path)?;

        let mut sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM ZSFNOTE n
             WHERE COALESCE(n.ZPERMANENTLYDELETED, 0) = 0"
        );
        let mut params: Vec<Value> = Vec::new();

        if !filter.include_trashed {
            sql.push_str(" AND COALESCE(n.ZTRASHED, 0) = 0");
        }
        if !filter.include_archived {
            sql.push_str(" AND COALESCE(n.ZARCHIVED, 0) = 0");
        }
        if let Some(from) = filter.created.from {
            sql.push_str(" AND n.ZCREATIONDATE >= ?");
            params.push(Value::Real(utc_to_core_data(from)));
        }
        if let Some(to) = filter.created.to {
            sql.push_str(" AND n.ZCREATIONDATE <= ?");
            params.push(Value::Real(utc_to_core_data(to)));
        }
        if !filter.tags.is_empty() {
            let tag_pks = self.matching_tag_pks(&conn, &filter.tags)?;
            if tag_pks.is_empty() {
                tracing::debug!("No tag matches the filter");
                return Ok(Vec::new());
            }
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM {table} nt WHERE nt.{note} = n.Z_PK AND nt.{tag} IN ({placeholders}))",
                table = self.schema.note_tag_table,
                note = self.schema.note_column,
                tag = self.schema.tag_column,
                placeholders = vec!["?"; tag_pks.len()].join(", "),
            ));
            params.extend(tag_pks.into_iter().map(Value::Integer));
        }
        sql.push_str(" ORDER BY n.ZMODIFICATIONDATE DESC LIMIT ?");
        params.push(Value::Integer(self.max_candidates as i64));

        let mut stmt = conn.prepare(&sql).context("Failed to prepare note query")?;
        let mut notes: Vec<(i64, NoteRecord)> = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), row_to_note)
            .context("Failed to query ZSFNOTE")?
            .filter_map(|r| {
                r.map_err(|e| tracing::warn!("Skipping malformed row: {e}"))
                    .ok()
            })
            .collect();

        let pks: Vec<i64> = notes.iter().map(|(pk, _)| *pk).collect();
        let mut tags = self.load_tags(&conn, &pks)?;
        for (pk, note) in notes.iter_mut() {
            note.tags = tags.remove(pk).unwrap_or_default();
        }

        tracing::debug!(count = notes.len(), "Fetched candidate notes");
        Ok(notes.into_iter().map(|(_, note)| note).collect())
    }

    fn fetch_note(&self, id: &str) -> Result<Option<NoteRecord>> {
        let conn = open_bear_db(&self.path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM ZSFNOTE n
             WHERE n.ZUNIQUEIDENTIFIER = ?1
               AND COALESCE(n.ZPERMANENTLYDELETED, 0) = 0"
        ))?;
        let mut rows = stmt.query_map([id], row_to_note)?;
        let Some((pk, mut note)) = rows.next().transpose()? else {
            return Ok(None);
        };
        note.tags = self.load_tags(&conn, &[pk])?.remove(&pk).unwrap_or_default();
        Ok(Some(note))
    }
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<(i64, NoteRecord)> {
    let flag = |idx: usize| -> rusqlite::Result<bool> {
        Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0) != 0)
    };
    let encrypted = flag(7)?;
    // Encrypted notes keep a placeholder in ZTEXT; never scan it.
    let body = if encrypted {
        None
    } else {
        row.get::<_, Option<String>>(3)?
    };
    let instant = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
        Ok(core_data_to_utc(row.get::<_, Option<f64>>(idx)?.unwrap_or(0.0)))
    };

    Ok((
        row.get::<_, i64>(0)?,
        NoteRecord {
            id: row.get::<_, String>(1)?,
            title: row.get::<_, Option<String>>(2)?,
            body,
            tags: Vec::new(),
            trashed: flag(4)?,
            archived: flag(5)?,
            pinned: flag(6)?,
            encrypted,
            created_at: instant(8)?,
            modified_at: instant(9)?,
        },
    ))
}
