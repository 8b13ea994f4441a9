use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{debug, warn};

use crate::scoring::{Leaderboard, ListKey, ScoreEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create store directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistent home of the two leaderboards
pub trait ScoreStore: Send {
    fn load(&self, list: ListKey) -> Result<Vec<ScoreEntry>>;
    /// Replaces the stored list with `entries`
    fn save(&mut self, list: ListKey, entries: &[ScoreEntry]) -> Result<()>;
}

/// Loads both leaderboards, treating unreadable lists as empty
pub fn load_leaderboards(store: &dyn ScoreStore) -> HashMap<ListKey, Leaderboard> {
    [ListKey::Normal, ListKey::Reverse]
        .into_iter()
        .map(|list| {
            let entries = store.load(list).unwrap_or_else(|err| {
                warn!(%list, error = %err, "could not load leaderboard");
                Vec::new()
            });
            (list, Leaderboard::from_entries(entries))
        })
        .collect()
}

/// SQLite-backed score store
#[derive(Debug)]
pub struct SqliteScoreStore {
    conn: Connection,
}

impl SqliteScoreStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening score store");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS scores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                list TEXT NOT NULL,
                rank INTEGER NOT NULL,
                score REAL NOT NULL,
                level INTEGER NOT NULL,
                pause_ms INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_scores_list ON scores(list, rank)",
            [],
        )?;

        Ok(Self { conn })
    }
}

impl ScoreStore for SqliteScoreStore {
    fn load(&self, list: ListKey) -> Result<Vec<ScoreEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT score, level, pause_ms, timestamp
            FROM scores
            WHERE list = ?1
            ORDER BY rank
            "#,
        )?;

        let rows = stmt.query_map([list.to_string()], |row| {
            let timestamp_str: String = row.get(3)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        3,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(ScoreEntry {
                score: row.get(0)?,
                level: row.get(1)?,
                pause_ms: row.get::<_, i64>(2)?.max(0) as u64,
                timestamp,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    fn save(&mut self, list: ListKey, entries: &[ScoreEntry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM scores WHERE list = ?1", [list.to_string()])?;

        for (rank, entry) in entries.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO scores (list, rank, score, level, pause_ms, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    list.to_string(),
                    rank as i64,
                    entry.score,
                    entry.level,
                    entry.pause_ms as i64,
                    entry.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// Volatile store used when the database can't be opened, and in tests
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    lists: HashMap<ListKey, Vec<ScoreEntry>>,
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self, list: ListKey) -> Result<Vec<ScoreEntry>> {
        Ok(self.lists.get(&list).cloned().unwrap_or_default())
    }

    fn save(&mut self, list: ListKey, entries: &[ScoreEntry]) -> Result<()> {
        self.lists.insert(list, entries.to_vec());
        Ok(())
    }
}
