//! Test collaborators and payloads

use super::constants::*;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tabgeni_server::analysis::{IdentificationError, IdentifiedTrack, TrackIdentifier};

/// Identifier that records every path it is asked about.
///
/// Matches [`IDENTIFIED_TITLE`] by [`IDENTIFIED_ARTIST`] unless switched to
/// no-match.
#[derive(Clone, Default)]
pub struct RecordingIdentifier {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    no_match: Arc<AtomicBool>,
}

impl RecordingIdentifier {
    pub fn matching() -> Self {
        Self::default()
    }

    pub fn never_matching() -> Self {
        let identifier = Self::default();
        identifier.no_match.store(true, Ordering::SeqCst);
        identifier
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackIdentifier for RecordingIdentifier {
    async fn identify(&self, audio: &Path) -> Result<Option<IdentifiedTrack>, IdentificationError> {
        self.calls.lock().unwrap().push(audio.to_path_buf());
        if self.no_match.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(IdentifiedTrack {
            title: IDENTIFIED_TITLE.to_string(),
            artist: IDENTIFIED_ARTIST.to_string(),
            album: Some(IDENTIFIED_ALBUM.to_string()),
            release_date: Some("1975-10-31".to_string()),
            spotify_url: None,
            thumbnail_url: None,
            duration_seconds: Some(354.0),
        }))
    }
}

/// A few bytes that sniff as MP3 (ID3v2 header).
pub fn fake_mp3_bytes() -> Vec<u8> {
    let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
    data.extend(std::iter::repeat(0u8).take(512));
    data
}

/// Body for `POST /library`.
pub fn saved_song_body(title: &str, artist: &str) -> Value {
    json!({
        "title": title,
        "artist": artist,
        "bpm": 120.0,
        "key": "A Minor",
        "chords": ["Am", "F", "C", "G"],
        "tabDocument": format!("{} - {}", title, artist),
        "genre": "Rock",
    })
}
