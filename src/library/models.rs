use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::analysis::AnalysisResult;

pub const ENTRY_ID_LEN: usize = 24;
pub const MAX_OWNER_ID_LEN: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum LibraryError {
    #[error("Invalid entry id: {0}")]
    InvalidId(String),

    #[error("Invalid owner id")]
    InvalidOwner,

    #[error("{0}")]
    Validation(String),
}

/// Library entry key: 24 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// 4 bytes of big-endian unix seconds followed by 8 random bytes.
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let mut random = [0u8; 8];
        rand::rng().fill_bytes(&mut random);

        let mut id = String::with_capacity(ENTRY_ID_LEN);
        for byte in seconds.to_be_bytes().iter().chain(random.iter()) {
            id.push_str(&format!("{:02x}", byte));
        }
        EntryId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntryId {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENTRY_ID_LEN || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LibraryError::InvalidId(s.chars().take(64).collect()));
        }
        Ok(EntryId(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Owner of library entries. Only `[A-Za-z0-9._@-]` survives parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn parse(raw: &str) -> Result<Self, LibraryError> {
        let sanitized: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '-'))
            .take(MAX_OWNER_ID_LEN)
            .collect();
        if sanitized.is_empty() {
            return Err(LibraryError::InvalidOwner);
        }
        Ok(OwnerId(sanitized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A saved song.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: EntryId,
    pub owner_id: OwnerId,
    #[serde(flatten)]
    pub song: AnalysisResult,
    pub genre: Option<String>,
    pub user_notes: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for saving a song. The owner is resolved separately.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLibraryEntry {
    #[serde(flatten)]
    pub song: AnalysisResult,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub user_notes: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl NewLibraryEntry {
    pub fn validate(&self) -> Result<(), LibraryError> {
        require_non_blank("title", &self.song.title)?;
        require_non_blank("artist", &self.song.artist)?;
        if let Some(metadata) = &self.metadata {
            require_object(metadata)?;
        }
        Ok(())
    }
}

/// Partial update. Absent fields are left untouched; an explicit `null`
/// clears the optional ones. `null` for title, artist, chords, tabs or
/// metadata counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntryPatch {
    pub title: Option<String>,
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub album: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub release_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub spotify_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub thumbnail_url: Option<Option<String>>,
    #[serde(default, alias = "duration", deserialize_with = "nullable")]
    pub duration_seconds: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bpm: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub key: Option<Option<String>>,
    pub chords: Option<Vec<String>>,
    #[serde(alias = "tabs")]
    pub tab_document: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub backing_track_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub youtube_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub audio_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub user_notes: Option<Option<String>>,
    pub metadata: Option<serde_json::Value>,
}

/// Present key: `Some(value)`, where `value` is `None` for `null`.
/// Absent keys fall back to `#[serde(default)]`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn set_if_present<T>(field: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *field = v;
    }
}

impl LibraryEntryPatch {
    pub fn validate(&self) -> Result<(), LibraryError> {
        if let Some(title) = &self.title {
            require_non_blank("title", title)?;
        }
        if let Some(artist) = &self.artist {
            require_non_blank("artist", artist)?;
        }
        if let Some(metadata) = &self.metadata {
            require_object(metadata)?;
        }
        Ok(())
    }

    pub fn apply_to(self, entry: &mut LibraryEntry) {
        let song = &mut entry.song;
        set_if_present(&mut song.title, self.title);
        set_if_present(&mut song.artist, self.artist);
        set_if_present(&mut song.album, self.album);
        set_if_present(&mut song.release_date, self.release_date);
        set_if_present(&mut song.spotify_url, self.spotify_url);
        set_if_present(&mut song.thumbnail_url, self.thumbnail_url);
        set_if_present(&mut song.duration_seconds, self.duration_seconds);
        set_if_present(&mut song.bpm, self.bpm);
        set_if_present(&mut song.key, self.key);
        set_if_present(&mut song.chords, self.chords);
        set_if_present(&mut song.tab_document, self.tab_document);
        set_if_present(&mut song.backing_track_url, self.backing_track_url);
        set_if_present(&mut song.youtube_url, self.youtube_url);
        set_if_present(&mut song.audio_url, self.audio_url);
        set_if_present(&mut entry.genre, self.genre);
        set_if_present(&mut entry.user_notes, self.user_notes);
        set_if_present(&mut entry.metadata, self.metadata);
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), LibraryError> {
    if value.trim().is_empty() {
        return Err(LibraryError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_object(value: &serde_json::Value) -> Result<(), LibraryError> {
    if !value.is_object() {
        return Err(LibraryError::Validation(
            "metadata must be a JSON object".to_string(),
        ));
    }
    Ok(())
}
