//! Upload and analysis endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::error::ApiError;
use super::metrics;
use super::state::{GuardedSongAnalyzer, ServerState};
use crate::analysis::{AnalysisRequest, StoredUpload};

/// Name of the multipart field carrying the audio file.
const AUDIO_FIELD: &str = "audio";

/// Room for multipart boundaries and the other form fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub filename: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

impl TryFrom<AnalyzeBody> for AnalysisRequest {
    type Error = ApiError;

    fn try_from(body: AnalyzeBody) -> Result<Self, Self::Error> {
        let filename = body.filename.filter(|f| !f.is_empty());
        if let Some(file_reference) = filename {
            return Ok(AnalysisRequest::Audio {
                file_reference,
                fallback_title: body.title,
                fallback_artist: body.artist,
            });
        }

        match (body.title, body.artist) {
            (Some(title), Some(artist)) => Ok(AnalysisRequest::Text { title, artist }),
            _ => Err(ApiError::Validation(
                "Either filename or both title and artist are required".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: &'static str,
    file: StoredUpload,
}

async fn upload_audio(
    State(state): State<ServerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        let stored = match state
            .analyzer
            .uploads()
            .save(original_name.as_deref(), content_type.as_deref(), &data)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                metrics::record_upload("rejected");
                return Err(e.into());
            }
        };
        metrics::record_upload("stored");
        info!(
            "Stored upload {} ({} bytes, {})",
            stored.filename, stored.size, stored.mimetype
        );

        let body = UploadResponse {
            success: true,
            message: "File uploaded successfully",
            file: stored,
        };
        return Ok(Json(body).into_response());
    }

    metrics::record_upload("rejected");
    Err(ApiError::Validation("No audio file uploaded".to_string()))
}

async fn analyze(
    State(analyzer): State<GuardedSongAnalyzer>,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let request = AnalysisRequest::try_from(body)?;
    let result = analyzer.analyze(request).await?;
    Ok(Json(json!({ "success": true, "data": result })).into_response())
}

pub fn make_analysis_routes(state: ServerState) -> Router {
    let upload_limit = state.config.max_upload_bytes as usize + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route(
            "/upload",
            post(upload_audio).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/analyze", post(analyze))
        .with_state(state)
}
