//! Storage for uploaded audio files.
//!
//! Every file lives directly inside a single uploads root. References coming
//! from clients are plain filenames; anything that would point elsewhere is
//! rejected before the filesystem is touched.

use rand::Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The reference contains path components, forbidden characters, or
    /// resolves outside the uploads root.
    #[error("Invalid file reference: {0}")]
    InvalidReference(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("File too large: {0} bytes (max: {1})")]
    TooLarge(u64, u64),

    #[error("Empty upload")]
    Empty,
}

/// Metadata about a freshly stored upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredUpload {
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
}

/// Reduces an arbitrary client-supplied name to a bare filename made only of
/// `[A-Za-z0-9._-]`, with no leading dot and no `..` sequence.
///
/// The result is stable: sanitizing it again returns it unchanged.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(|c| c == '/' || c == '\\').next().unwrap_or("");

    let mut sanitized = String::with_capacity(base.len());
    for c in base.chars() {
        if !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            continue;
        }
        if c == '.' && sanitized.ends_with('.') {
            continue;
        }
        sanitized.push(c);
    }

    sanitized.trim_start_matches('.').to_string()
}

/// Checks that `path` exists and sits strictly inside `root`, following
/// symlinks. Returns the canonical path.
pub fn ensure_inside_root(root: &Path, path: &Path) -> Result<PathBuf, UploadError> {
    let canonical_root = root.canonicalize()?;
    let canonical_path = match path.canonicalize() {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UploadError::NotFound(display_name(path)));
        }
        Err(e) => return Err(e.into()),
    };

    if canonical_path == canonical_root || !canonical_path.starts_with(&canonical_root) {
        return Err(UploadError::InvalidReference(display_name(path)));
    }
    Ok(canonical_path)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub struct UploadStore {
    root: PathBuf,
    max_file_size: u64,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Creates the uploads root if needed.
    pub async fn init(&self) -> Result<(), UploadError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Maps a client reference to the stored file it names.
    ///
    /// The reference must already be in sanitized form; a reference that
    /// changes under sanitization is treated as a traversal attempt.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, UploadError> {
        let sanitized = sanitize_filename(reference);
        if sanitized.is_empty() || sanitized != reference {
            return Err(UploadError::InvalidReference(sanitized));
        }
        ensure_inside_root(&self.root, &self.root.join(&sanitized))
    }

    /// Public URL under which a stored upload is served.
    pub fn public_url(reference: &str) -> String {
        format!("/uploads/{}", sanitize_filename(reference))
    }

    /// Stores a new upload under a generated name.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        declared_type: Option<&str>,
        data: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        let size = data.len() as u64;
        if size == 0 {
            return Err(UploadError::Empty);
        }
        if size > self.max_file_size {
            return Err(UploadError::TooLarge(size, self.max_file_size));
        }

        let mimetype = audio_mime_type(declared_type, data)?;
        let filename = generate_filename(original_name);

        let path = self.root.join(&filename);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        Ok(StoredUpload {
            filename,
            size,
            mimetype,
        })
    }
}

/// Accepts the declared content type when it is an audio type. Untyped
/// uploads are sniffed from their magic bytes.
fn audio_mime_type(declared: Option<&str>, data: &[u8]) -> Result<String, UploadError> {
    match declared.map(|d| d.trim().to_ascii_lowercase()) {
        Some(d) if d.starts_with("audio/") => Ok(d),
        Some(d) if !d.is_empty() && d != "application/octet-stream" => {
            Err(UploadError::UnsupportedMediaType(d))
        }
        _ => match infer::get(data) {
            Some(kind) if kind.mime_type().starts_with("audio/") => {
                Ok(kind.mime_type().to_string())
            }
            Some(kind) => Err(UploadError::UnsupportedMediaType(
                kind.mime_type().to_string(),
            )),
            None => Err(UploadError::UnsupportedMediaType("unknown".to_string())),
        },
    }
}

fn generate_filename(original_name: Option<&str>) -> String {
    let extension: String = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ext.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(10)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .unwrap_or_default();

    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    if extension.is_empty() {
        format!("audio-{}-{}", millis, suffix)
    } else {
        format!("audio-{}-{}.{}", millis, suffix, extension)
    }
}
