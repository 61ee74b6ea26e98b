//! Song identification through an audio fingerprinting service.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::IdentifiedTrack;
use super::retry_policy::RetryPolicy;
use super::uploads::{ensure_inside_root, UploadError};

pub const DEFAULT_AUDD_ENDPOINT: &str = "https://api.audd.io/";

#[derive(Debug, Error)]
pub enum IdentificationError {
    /// The audio path does not sit inside the uploads root.
    #[error("Audio file is outside the uploads directory")]
    OutsideRoot,

    #[error("Failed to read audio file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered 2xx but reported a failure in its payload.
    #[error("Service error: {0}")]
    Service(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl IdentificationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            IdentificationError::Timeout | IdentificationError::Connection(_) => true,
            IdentificationError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Recognizes a song from an audio file.
///
/// `Ok(None)` means the service had no match.
#[async_trait]
pub trait TrackIdentifier: Send + Sync {
    async fn identify(&self, audio: &Path) -> Result<Option<IdentifiedTrack>, IdentificationError>;
}

#[derive(Debug, Clone)]
pub struct AuddSettings {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// Client for the AudD recognition API.
pub struct AuddIdentifier {
    client: Client,
    settings: AuddSettings,
    uploads_root: PathBuf,
}

impl AuddIdentifier {
    pub fn new(settings: AuddSettings, uploads_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            uploads_root: uploads_root.into(),
        })
    }

    async fn request_once(
        &self,
        file_name: &str,
        data: Bytes,
    ) -> Result<Option<IdentifiedTrack>, IdentificationError> {
        let length = data.len() as u64;
        let file_part = Part::stream_with_length(data, length).file_name(file_name.to_string());
        let form = Form::new()
            .text("api_token", self.settings.api_key.clone())
            .text("return", "apple_music,spotify")
            .part("file", file_part);

        let response = self
            .client
            .post(&self.settings.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentificationError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(map_transport_error)?;
        let parsed: AuddResponse = serde_json::from_str(&body)
            .map_err(|e| IdentificationError::Malformed(e.to_string()))?;
        parsed.into_identified_track()
    }
}

#[async_trait]
impl TrackIdentifier for AuddIdentifier {
    async fn identify(&self, audio: &Path) -> Result<Option<IdentifiedTrack>, IdentificationError> {
        let path = match ensure_inside_root(&self.uploads_root, audio) {
            Ok(path) => path,
            Err(UploadError::Io(e)) => return Err(IdentificationError::Io(e)),
            Err(UploadError::NotFound(name)) => {
                return Err(IdentificationError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    name,
                )))
            }
            Err(_) => return Err(IdentificationError::OutsideRoot),
        };

        // Read once; every attempt shares the same buffer.
        let data = Bytes::from(tokio::fs::read(&path).await?);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());

        let mut retry_count = 0;
        loop {
            match self.request_once(&file_name, data.clone()).await {
                Ok(track) => return Ok(track),
                Err(e)
                    if self
                        .settings
                        .retry
                        .should_retry(e.is_retryable(), retry_count) =>
                {
                    let backoff = self.settings.retry.backoff(retry_count);
                    warn!(
                        "AudD request failed ({}), retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        retry_count + 1,
                        self.settings.retry.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> IdentificationError {
    if e.is_timeout() {
        IdentificationError::Timeout
    } else {
        IdentificationError::Connection(e.to_string())
    }
}

/// Used when no API key is configured. Never identifies anything.
#[derive(Default)]
pub struct DisabledIdentifier {
    logged: AtomicBool,
}

impl DisabledIdentifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackIdentifier for DisabledIdentifier {
    async fn identify(&self, audio: &Path) -> Result<Option<IdentifiedTrack>, IdentificationError> {
        if !self.logged.swap(true, Ordering::Relaxed) {
            info!("No AudD API key configured, audio identification is disabled");
        }
        debug!("Skipping identification of {:?}", audio.file_name());
        Ok(None)
    }
}

// =============================================================================
// AudD response payload
// =============================================================================

#[derive(Debug, Deserialize)]
struct AuddResponse {
    status: String,
    #[serde(default)]
    result: Option<AuddResult>,
    #[serde(default)]
    error: Option<AuddErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct AuddErrorPayload {
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuddResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    spotify: Option<SpotifyInfo>,
}

#[derive(Debug, Deserialize)]
struct SpotifyInfo {
    #[serde(default)]
    external_urls: Option<SpotifyExternalUrls>,
    #[serde(default)]
    album: Option<SpotifyAlbum>,
    #[serde(default)]
    duration_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SpotifyExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

impl AuddResponse {
    fn into_identified_track(self) -> Result<Option<IdentifiedTrack>, IdentificationError> {
        if self.status != "success" {
            let message = match self.error {
                Some(err) => format!(
                    "code {}: {}",
                    err.error_code.unwrap_or_default(),
                    err.error_message.unwrap_or_default()
                ),
                None => format!("status {}", self.status),
            };
            return Err(IdentificationError::Service(message));
        }

        let Some(result) = self.result else {
            return Ok(None);
        };

        let spotify = result.spotify;
        let spotify_url = spotify
            .as_ref()
            .and_then(|s| s.external_urls.as_ref())
            .and_then(|u| u.spotify.clone());
        let thumbnail_url = spotify
            .as_ref()
            .and_then(|s| s.album.as_ref())
            .and_then(|a| a.images.first())
            .map(|i| i.url.clone());
        let duration_seconds = spotify
            .as_ref()
            .and_then(|s| s.duration_ms)
            .map(|ms| ms / 1000.0);

        let track = IdentifiedTrack {
            title: result.title.unwrap_or_default(),
            artist: result.artist.unwrap_or_default(),
            album: result.album,
            release_date: result.release_date,
            spotify_url,
            thumbnail_url,
            duration_seconds,
        };

        if track.is_usable() {
            Ok(Some(track))
        } else {
            Ok(None)
        }
    }
}
