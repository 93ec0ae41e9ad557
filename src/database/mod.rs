pub mod models;

#[cfg(test)]
mod tests;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub use models::*;

/// SQLite-backed store for episodes and show notes.
///
/// All access goes through a single `Mutex<Connection>`, which doubles as
/// the mutation lock: the duplicate-guid check and the insert in
/// [`Database::create_episode`] happen under one lock acquisition, so two
/// concurrent refresh cycles cannot race on the same feed item.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
        ",
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// In-memory store with the same CRUD contract as the durable one.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guid TEXT NOT NULL UNIQUE,
                number TEXT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                audio_url TEXT NOT NULL DEFAULT '',
                publication_date TEXT NOT NULL,
                duration TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_episodes_published
                ON episodes(publication_date DESC);

            CREATE TABLE IF NOT EXISTS show_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                timestamp TEXT,
                episode_id INTEGER NOT NULL,
                FOREIGN KEY (episode_id) REFERENCES episodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_show_notes_episode
                ON show_notes(episode_id);
        "#,
        )?;
        Ok(())
    }

    // ========================================================================
    // Episodes
    // ========================================================================

    pub fn create_episode(&self, episode: &NewEpisode) -> Result<Episode> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM episodes WHERE guid = ?1",
                params![episode.guid],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Err(anyhow!(
                "Episode with guid '{}' already exists (id {})",
                episode.guid,
                id
            ));
        }

        conn.execute(
            "INSERT INTO episodes (guid, number, title, description, audio_url,
                                   publication_date, duration, url, tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                episode.guid,
                episode.number,
                episode.title,
                episode.description,
                episode.audio_url,
                episode.publication_date.to_rfc3339(),
                episode.duration,
                episode.url,
                serde_json::to_string(&episode.tags)?,
            ],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Episode {
            id,
            guid: episode.guid.clone(),
            number: episode.number.clone(),
            title: episode.title.clone(),
            description: episode.description.clone(),
            audio_url: episode.audio_url.clone(),
            publication_date: episode.publication_date,
            duration: episode.duration.clone(),
            url: episode.url.clone(),
            tags: episode.tags.clone(),
        })
    }

    pub fn get_episodes(&self) -> Result<Vec<Episode>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, guid, number, title, description, audio_url,
                    publication_date, duration, url, tags
             FROM episodes ORDER BY id",
        )?;
        let episodes = stmt
            .query_map([], map_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    pub fn get_episode_by_id(&self, id: i64) -> Result<Option<Episode>> {
        let conn = self.conn.lock().unwrap();
        let episode = conn
            .query_row(
                "SELECT id, guid, number, title, description, audio_url,
                        publication_date, duration, url, tags
                 FROM episodes WHERE id = ?1",
                params![id],
                map_episode,
            )
            .optional()?;
        Ok(episode)
    }

    pub fn get_episode_by_guid(&self, guid: &str) -> Result<Option<Episode>> {
        let conn = self.conn.lock().unwrap();
        let episode = conn
            .query_row(
                "SELECT id, guid, number, title, description, audio_url,
                        publication_date, duration, url, tags
                 FROM episodes WHERE guid = ?1",
                params![guid],
                map_episode,
            )
            .optional()?;
        Ok(episode)
    }

    pub fn get_episode_by_number(&self, number: &str) -> Result<Option<Episode>> {
        let conn = self.conn.lock().unwrap();
        let episode = conn
            .query_row(
                "SELECT id, guid, number, title, description, audio_url,
                        publication_date, duration, url, tags
                 FROM episodes WHERE number = ?1",
                params![number],
                map_episode,
            )
            .optional()?;
        Ok(episode)
    }

    /// Episodes still lacking a display number, for the repair pass.
    pub fn episodes_missing_number(&self) -> Result<Vec<Episode>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, guid, number, title, description, audio_url,
                    publication_date, duration, url, tags
             FROM episodes WHERE number IS NULL OR number = '' ORDER BY id",
        )?;
        let episodes = stmt
            .query_map([], map_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    /// The only permitted episode update: back-filling a missing number.
    pub fn update_episode_number(&self, id: i64, number: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE episodes SET number = ?1 WHERE id = ?2",
            params![number, id],
        )?;
        if changed == 0 {
            return Err(anyhow!("Episode {} not found", id));
        }
        Ok(())
    }

    /// Most recent episodes, date-descending, offset/limit page.
    ///
    /// Dates are stored as RFC 3339 UTC text, so lexicographic ORDER BY is
    /// chronological.
    pub fn latest_episodes(&self, limit: i64, offset: i64) -> Result<Vec<Episode>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, guid, number, title, description, audio_url,
                    publication_date, duration, url, tags
             FROM episodes
             ORDER BY publication_date DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let episodes = stmt
            .query_map(params![limit, offset], map_episode)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(episodes)
    }

    pub fn episode_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM episodes", [], |row| row.get(0))?;
        Ok(count)
    }

    // ========================================================================
    // Show notes
    // ========================================================================

    pub fn create_show_note(&self, note: &NewShowNote) -> Result<ShowNote> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO show_notes (title, content, timestamp, episode_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![note.title, note.content, note.timestamp, note.episode_id],
        )?;
        let id = conn.last_insert_rowid();

        Ok(ShowNote {
            id,
            title: note.title.clone(),
            content: note.content.clone(),
            timestamp: note.timestamp.clone(),
            episode_id: note.episode_id,
        })
    }

    /// Show notes of one episode, in creation (= appearance) order.
    pub fn get_show_notes(&self, episode_id: i64) -> Result<Vec<ShowNote>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, content, timestamp, episode_id
             FROM show_notes WHERE episode_id = ?1 ORDER BY id",
        )?;
        let notes = stmt
            .query_map(params![episode_id], |row| {
                Ok(ShowNote {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                    timestamp: row.get(3)?,
                    episode_id: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }
}

fn map_episode(row: &Row<'_>) -> rusqlite::Result<Episode> {
    let date_text: String = row.get(6)?;
    let publication_date = DateTime::parse_from_rfc3339(&date_text)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let tags_text: String = row.get(9)?;

    Ok(Episode {
        id: row.get(0)?,
        guid: row.get(1)?,
        number: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        audio_url: row.get(5)?,
        publication_date,
        duration: row.get(7)?,
        url: row.get(8)?,
        tags: serde_json::from_str(&tags_text).unwrap_or_default(),
    })
}
