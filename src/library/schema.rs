//! SQLite schema definitions for the library database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// One row per saved song.
const LIBRARY_ENTRIES_TABLE_V1: Table = Table {
    name: "library_entries",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("owner_id", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("spotify_url", &SqlType::Text),
        sqlite_column!("thumbnail_url", &SqlType::Text),
        sqlite_column!("duration_seconds", &SqlType::Real),
        sqlite_column!("bpm", &SqlType::Real),
        sqlite_column!("musical_key", &SqlType::Text),
        sqlite_column!(
            "chords",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'[]'")
        ), // JSON array
        sqlite_column!(
            "tab_document",
            &SqlType::Text,
            non_null = true,
            default_value = Some("''")
        ),
        sqlite_column!("backing_track_url", &SqlType::Text),
        sqlite_column!("youtube_url", &SqlType::Text),
        sqlite_column!("audio_url", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("user_notes", &SqlType::Text),
        sqlite_column!(
            "metadata",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'{}'")
        ), // JSON object
        // RFC 3339 with microseconds, so text order is time order
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_library_owner_created", "owner_id, created_at")],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[LIBRARY_ENTRIES_TABLE_V1],
    migration: None,
}];
