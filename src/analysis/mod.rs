mod analyzer;
mod enrichment;
mod error;
mod features;
mod identification;
mod models;
mod retry_policy;
mod uploads;

pub use analyzer::{AnalysisTimeouts, SongAnalyzer};
pub use enrichment::{EnrichmentProvider, MockEnrichmentProvider};
pub use error::AnalysisError;
pub use features::{FeatureDetector, PlaceholderFeatureDetector};
pub use identification::{
    AuddIdentifier, AuddSettings, DisabledIdentifier, IdentificationError, TrackIdentifier,
    DEFAULT_AUDD_ENDPOINT,
};
pub use models::{
    AnalysisRequest, AnalysisResult, AudioFeatures, BackingTrackLinks, IdentifiedTrack, Mode,
    MusicalKey, PitchClass, TabsAndChords,
};
pub use retry_policy::RetryPolicy;
pub use uploads::{sanitize_filename, StoredUpload, UploadError, UploadStore};
