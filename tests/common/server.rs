//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own uploads directory and
//! library database.

use super::constants::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tabgeni_server::analysis::{
    DisabledIdentifier, MockEnrichmentProvider, PlaceholderFeatureDetector, SongAnalyzer,
    TrackIdentifier, UploadStore,
};
use tabgeni_server::library::{LibraryStore, OwnerId, SqliteLibraryStore};
use tabgeni_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated storage
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Library store for direct database access in tests
    pub library_store: Arc<dyn LibraryStore>,

    /// Directory uploads are written to
    pub uploads_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with identification disabled.
    pub async fn spawn() -> Self {
        Self::spawn_with_identifier(Arc::new(DisabledIdentifier::new())).await
    }

    /// Spawns a server on a random port using the given identifier.
    ///
    /// # Panics
    ///
    /// Panics if storage setup, port binding or startup fails.
    pub async fn spawn_with_identifier(identifier: Arc<dyn TrackIdentifier>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let uploads_dir = temp_dir.path().join("uploads");

        let uploads = Arc::new(UploadStore::new(&uploads_dir, TEST_MAX_UPLOAD_BYTES));
        uploads.init().await.expect("Failed to create uploads dir");

        let analyzer = Arc::new(SongAnalyzer::new(
            uploads,
            identifier,
            Arc::new(PlaceholderFeatureDetector),
            Arc::new(MockEnrichmentProvider),
        ));

        let library_store: Arc<dyn LibraryStore> = Arc::new(
            SqliteLibraryStore::new(temp_dir.path().join("library.db"))
                .expect("Failed to open library store"),
        );

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            default_owner_id: OwnerId::parse(DEFAULT_OWNER).expect("Invalid test owner"),
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        };

        let app = make_app(config, analyzer, library_store.clone()).expect("Failed to build app");

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            library_store,
            uploads_dir,
            _temp_dir: temp_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling /health
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/health", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
