use thiserror::Error;

/// Errors that abort an analysis request.
///
/// Failures of individual upstream dependencies never show up here; they
/// are absorbed by the analyzer and turn into absent fields.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The file reference tried to escape the uploads directory.
    #[error("Rejected file reference: {0}")]
    Security(String),

    #[error("Uploaded file not found: {0}")]
    NotFound(String),

    /// Identification came back empty and the caller gave no usable
    /// title/artist to fall back on.
    #[error("Could not identify the song and no title/artist was provided")]
    Unidentified,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
