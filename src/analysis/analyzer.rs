//! Song analysis orchestration.
//!
//! An analysis resolves the song's title and artist (from the request or by
//! identifying an uploaded file), then fans out to the feature detectors and
//! enrichment providers. Every dependency call is isolated: a failure or a
//! timeout only blanks the fields that call would have filled.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::enrichment::EnrichmentProvider;
use super::error::AnalysisError;
use super::features::{is_plausible_bpm, FeatureDetector};
use super::identification::{IdentificationError, TrackIdentifier};
use super::models::{AnalysisRequest, AnalysisResult, AudioFeatures, IdentifiedTrack, MusicalKey};
use super::uploads::{UploadError, UploadStore};
use crate::server::metrics;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisTimeouts {
    pub identification: Duration,
    pub detection: Duration,
    pub enrichment: Duration,
}

impl Default for AnalysisTimeouts {
    fn default() -> Self {
        Self {
            identification: Duration::from_secs(30),
            detection: Duration::from_secs(10),
            enrichment: Duration::from_secs(10),
        }
    }
}

pub struct SongAnalyzer {
    uploads: Arc<UploadStore>,
    identifier: Arc<dyn TrackIdentifier>,
    detector: Arc<dyn FeatureDetector>,
    enrichment: Arc<dyn EnrichmentProvider>,
    timeouts: AnalysisTimeouts,
}

impl SongAnalyzer {
    pub fn new(
        uploads: Arc<UploadStore>,
        identifier: Arc<dyn TrackIdentifier>,
        detector: Arc<dyn FeatureDetector>,
        enrichment: Arc<dyn EnrichmentProvider>,
    ) -> Self {
        Self {
            uploads,
            identifier,
            detector,
            enrichment,
            timeouts: AnalysisTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: AnalysisTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Runs a full analysis. Never touches the library.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let (path_label, outcome) = match request {
            AnalysisRequest::Text { title, artist } => {
                ("text", self.analyze_text(&title, &artist).await)
            }
            AnalysisRequest::Audio {
                file_reference,
                fallback_title,
                fallback_artist,
            } => (
                "audio",
                self.analyze_audio(
                    &file_reference,
                    fallback_title.as_deref(),
                    fallback_artist.as_deref(),
                )
                .await,
            ),
        };

        let outcome_label = match &outcome {
            Ok(_) => "success",
            Err(AnalysisError::Validation(_)) => "invalid",
            Err(AnalysisError::Unidentified) => "unidentified",
            Err(AnalysisError::Security(_)) => "rejected",
            Err(AnalysisError::NotFound(_)) => "not_found",
            Err(AnalysisError::Internal(_)) => "error",
        };
        metrics::record_analysis(path_label, outcome_label, start.elapsed());

        if let Ok(result) = &outcome {
            info!(
                "Analyzed {} request: \"{}\" by {} in {:?}",
                path_label,
                result.title,
                result.artist,
                start.elapsed()
            );
        }
        outcome
    }

    async fn analyze_text(&self, title: &str, artist: &str) -> Result<AnalysisResult, AnalysisError> {
        if is_blank(title) || is_blank(artist) {
            return Err(AnalysisError::Validation(
                "Both title and artist are required".to_string(),
            ));
        }

        let mut result = AnalysisResult::from_text(title, artist);
        self.enrich(&mut result).await;
        Ok(result)
    }

    async fn analyze_audio(
        &self,
        file_reference: &str,
        fallback_title: Option<&str>,
        fallback_artist: Option<&str>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let path = self
            .uploads
            .resolve(file_reference)
            .map_err(|e| match e {
                UploadError::InvalidReference(_) => {
                    AnalysisError::Security(file_reference.to_string())
                }
                UploadError::NotFound(name) => AnalysisError::NotFound(name),
                other => AnalysisError::Internal(other.into()),
            })?;

        let (identified, bpm, key) = tokio::join!(
            self.identify(&path),
            self.detect_bpm(&path),
            self.detect_key(&path)
        );

        let mut result = match identified {
            Some(track) => AnalysisResult::from_identified(track),
            None => match (fallback_title, fallback_artist) {
                (Some(title), Some(artist)) if !is_blank(title) && !is_blank(artist) => {
                    debug!("Identification missed, using caller-supplied title/artist");
                    AnalysisResult::from_text(title, artist)
                }
                _ => return Err(AnalysisError::Unidentified),
            },
        };

        result.apply_features(AudioFeatures { bpm, key });
        result.audio_url = Some(UploadStore::public_url(file_reference));

        self.enrich(&mut result).await;
        Ok(result)
    }

    async fn identify(&self, path: &Path) -> Option<IdentifiedTrack> {
        match timeout(self.timeouts.identification, self.identifier.identify(path)).await {
            Ok(Ok(Some(track))) if track.is_usable() => Some(track),
            Ok(Ok(_)) => {
                debug!("No identification match for {:?}", path.file_name());
                None
            }
            Ok(Err(IdentificationError::OutsideRoot)) => {
                error!(
                    "Identifier refused {:?}: path is outside the uploads directory",
                    path
                );
                metrics::record_upstream_failure("identification");
                None
            }
            Ok(Err(e)) => {
                warn!("Identification failed: {}", e);
                metrics::record_upstream_failure("identification");
                None
            }
            Err(_) => {
                warn!(
                    "Identification timed out after {:?}",
                    self.timeouts.identification
                );
                metrics::record_upstream_failure("identification");
                None
            }
        }
    }

    async fn detect_bpm(&self, path: &Path) -> Option<f64> {
        let bpm = guarded(
            "bpm_detection",
            self.timeouts.detection,
            self.detector.detect_bpm(path),
        )
        .await
        .flatten()?;

        if is_plausible_bpm(bpm) {
            Some(bpm)
        } else {
            debug!("Discarding implausible BPM {}", bpm);
            None
        }
    }

    async fn detect_key(&self, path: &Path) -> Option<MusicalKey> {
        guarded(
            "key_detection",
            self.timeouts.detection,
            self.detector.detect_key(path),
        )
        .await
        .flatten()
    }

    async fn enrich(&self, result: &mut AnalysisResult) {
        let (tabs, links) = tokio::join!(
            guarded(
                "tabs",
                self.timeouts.enrichment,
                self.enrichment
                    .fetch_tabs_and_chords(&result.title, &result.artist),
            ),
            guarded(
                "backing_track",
                self.timeouts.enrichment,
                self.enrichment
                    .fetch_backing_track(&result.title, &result.artist),
            )
        );

        result.apply_tabs(tabs.unwrap_or_default());
        result.apply_links(links.unwrap_or_default());
    }
}

/// Awaits one dependency call under its own deadline, folding failure and
/// timeout into `None`.
async fn guarded<T, F>(dependency: &str, limit: Duration, call: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match timeout(limit, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{} failed: {:#}", dependency, e);
            metrics::record_upstream_failure(dependency);
            None
        }
        Err(_) => {
            warn!("{} timed out after {:?}", dependency, limit);
            metrics::record_upstream_failure(dependency);
            None
        }
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
