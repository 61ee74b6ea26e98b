//! SQLite-backed library store implementation.

use super::models::{EntryId, LibraryEntry, LibraryEntryPatch, NewLibraryEntry, OwnerId};
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::LibraryStore;
use crate::analysis::AnalysisResult;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const ENTRY_COLUMNS: &str = "id, owner_id, title, artist, album, release_date, spotify_url,
    thumbnail_url, duration_seconds, bpm, musical_key, chords, tab_document,
    backing_track_url, youtube_url, audio_url, genre, user_notes, metadata,
    created_at, updated_at";

#[derive(Clone)]
pub struct SqliteLibraryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLibraryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, LIBRARY_VERSIONED_SCHEMAS, "library")?;

        let total: usize = conn
            .query_row("SELECT COUNT(*) FROM library_entries", [], |r| r.get(0))
            .context("Failed to count library entries")?;
        info!("Library store ready: {} entries", total);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("Library connection mutex poisoned"))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

// Helper: deserialize the chords column, tolerating bad data
fn parse_chords(json: String) -> Vec<String> {
    serde_json::from_str(&json).unwrap_or_else(|e| {
        warn!("Malformed chords JSON in library db: {}: {}", json, e);
        Vec::new()
    })
}

fn parse_metadata(json: String) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(&json) {
        Ok(value) if value.is_object() => value,
        Ok(_) | Err(_) => {
            warn!("Malformed metadata JSON in library db: {}", json);
            serde_json::json!({})
        }
    }
}

fn row_to_entry(row: &Row) -> rusqlite::Result<LibraryEntry> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    Ok(LibraryEntry {
        id: id.parse::<EntryId>().map_err(|e| conversion_error(0, e))?,
        owner_id: OwnerId::parse(&owner).map_err(|e| conversion_error(1, e))?,
        song: AnalysisResult {
            title: row.get(2)?,
            artist: row.get(3)?,
            album: row.get(4)?,
            release_date: row.get(5)?,
            spotify_url: row.get(6)?,
            thumbnail_url: row.get(7)?,
            duration_seconds: row.get(8)?,
            bpm: row.get(9)?,
            key: row.get(10)?,
            chords: parse_chords(row.get(11)?),
            tab_document: row.get(12)?,
            backing_track_url: row.get(13)?,
            youtube_url: row.get(14)?,
            audio_url: row.get(15)?,
        },
        genre: row.get(16)?,
        user_notes: row.get(17)?,
        metadata: parse_metadata(row.get(18)?),
        created_at: parse_timestamp(row, 19)?,
        updated_at: parse_timestamp(row, 20)?,
    })
}

fn select_entry(conn: &Connection, id: &EntryId) -> Result<Option<LibraryEntry>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM library_entries WHERE id = ?1",
        ENTRY_COLUMNS
    ))?;
    let entry = stmt
        .query_row(params![id.as_str()], row_to_entry)
        .optional()?;
    Ok(entry)
}

impl LibraryStore for SqliteLibraryStore {
    fn list(&self, owner: &OwnerId) -> Result<Vec<LibraryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM library_entries WHERE owner_id = ?1
             ORDER BY created_at DESC, rowid DESC",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![owner.as_str()], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list library entries")?;
        Ok(entries)
    }

    fn get(&self, id: &EntryId) -> Result<Option<LibraryEntry>> {
        let conn = self.lock()?;
        select_entry(&conn, id)
    }

    fn create(&self, owner: &OwnerId, entry: NewLibraryEntry) -> Result<LibraryEntry> {
        entry.validate()?;

        let now = Utc::now().trunc_subsecs(6);
        let entry = LibraryEntry {
            id: EntryId::generate(),
            owner_id: owner.clone(),
            song: entry.song,
            genre: entry.genre,
            user_notes: entry.user_notes,
            metadata: entry.metadata.unwrap_or_else(|| serde_json::json!({})),
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock()?;
        let song = &entry.song;
        conn.execute(
            "INSERT INTO library_entries
             (id, owner_id, title, artist, album, release_date, spotify_url, thumbnail_url,
              duration_seconds, bpm, musical_key, chords, tab_document, backing_track_url,
              youtube_url, audio_url, genre, user_notes, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                entry.id.as_str(),
                entry.owner_id.as_str(),
                song.title,
                song.artist,
                song.album,
                song.release_date,
                song.spotify_url,
                song.thumbnail_url,
                song.duration_seconds,
                song.bpm,
                song.key,
                serde_json::to_string(&song.chords)?,
                song.tab_document,
                song.backing_track_url,
                song.youtube_url,
                song.audio_url,
                entry.genre,
                entry.user_notes,
                serde_json::to_string(&entry.metadata)?,
                format_timestamp(&entry.created_at),
                format_timestamp(&entry.updated_at),
            ],
        )
        .context("Failed to insert library entry")?;

        debug!("Created library entry {} for {}", entry.id, entry.owner_id);
        Ok(entry)
    }

    fn update(&self, id: &EntryId, patch: LibraryEntryPatch) -> Result<Option<LibraryEntry>> {
        patch.validate()?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let Some(mut entry) = select_entry(&tx, id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut entry);
        entry.updated_at = Utc::now().trunc_subsecs(6).max(entry.created_at);

        let song = &entry.song;
        tx.execute(
            "UPDATE library_entries SET
                title = ?2, artist = ?3, album = ?4, release_date = ?5, spotify_url = ?6,
                thumbnail_url = ?7, duration_seconds = ?8, bpm = ?9, musical_key = ?10,
                chords = ?11, tab_document = ?12, backing_track_url = ?13, youtube_url = ?14,
                audio_url = ?15, genre = ?16, user_notes = ?17, metadata = ?18, updated_at = ?19
             WHERE id = ?1",
            params![
                entry.id.as_str(),
                song.title,
                song.artist,
                song.album,
                song.release_date,
                song.spotify_url,
                song.thumbnail_url,
                song.duration_seconds,
                song.bpm,
                song.key,
                serde_json::to_string(&song.chords)?,
                song.tab_document,
                song.backing_track_url,
                song.youtube_url,
                song.audio_url,
                entry.genre,
                entry.user_notes,
                serde_json::to_string(&entry.metadata)?,
                format_timestamp(&entry.updated_at),
            ],
        )
        .context("Failed to update library entry")?;
        tx.commit()?;

        Ok(Some(entry))
    }

    fn delete(&self, id: &EntryId) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM library_entries WHERE id = ?1",
                params![id.as_str()],
            )
            .context("Failed to delete library entry")?;
        Ok(deleted > 0)
    }

    fn count(&self, owner: &OwnerId) -> Result<usize> {
        let conn = self.lock()?;
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM library_entries WHERE owner_id = ?1",
            params![owner.as_str()],
            |r| r.get(0),
        )?;
        Ok(count)
    }
}
