//! Tabgeni Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod analysis;
pub mod config;
pub mod library;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use analysis::{AnalysisRequest, AnalysisResult, SongAnalyzer};
pub use library::{LibraryStore, SqliteLibraryStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
