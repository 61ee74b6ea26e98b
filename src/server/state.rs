use axum::extract::FromRef;

use crate::analysis::SongAnalyzer;
use crate::library::LibraryStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedSongAnalyzer = Arc<SongAnalyzer>;
pub type GuardedLibraryStore = Arc<dyn LibraryStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub analyzer: GuardedSongAnalyzer,
    pub library_store: GuardedLibraryStore,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        analyzer: GuardedSongAnalyzer,
        library_store: GuardedLibraryStore,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            analyzer,
            library_store,
        }
    }
}

impl FromRef<ServerState> for GuardedSongAnalyzer {
    fn from_ref(input: &ServerState) -> Self {
        input.analyzer.clone()
    }
}

impl FromRef<ServerState> for GuardedLibraryStore {
    fn from_ref(input: &ServerState) -> Self {
        input.library_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
