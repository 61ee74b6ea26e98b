use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::{fmt::Debug, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabgeni_server::analysis::{
    AuddIdentifier, AuddSettings, DisabledIdentifier, MockEnrichmentProvider,
    PlaceholderFeatureDetector, SongAnalyzer, TrackIdentifier, UploadStore,
};
use tabgeni_server::config::{self, DEFAULT_MAX_UPLOAD_MB, DEFAULT_OWNER_ID};
use tabgeni_server::library::SqliteLibraryStore;
use tabgeni_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding library.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Directory for uploaded audio. Defaults to <db-dir>/uploads.
    #[clap(long, value_parser = parse_path)]
    pub uploads_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// AudD API token. Audio identification is disabled without it.
    #[clap(long, env = "AUDD_API_KEY", hide_env_values = true)]
    pub audd_api_key: Option<String>,

    /// Owner of library requests that do not specify one.
    #[clap(long, default_value = DEFAULT_OWNER_ID)]
    pub default_owner_id: String,

    /// Maximum size of an uploaded audio file, in megabytes.
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: u64,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            uploads_dir: args.uploads_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            audd_api_key: args.audd_api_key.clone(),
            default_owner_id: args.default_owner_id.clone(),
            max_upload_mb: args.max_upload_mb,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // TOML overrides CLI
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  uploads_dir: {:?}", app_config.uploads_dir);
    info!("  port: {}", app_config.port);
    info!("  default owner: {}", app_config.default_owner_id);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let uploads = Arc::new(UploadStore::new(
        &app_config.uploads_dir,
        app_config.max_upload_bytes,
    ));
    uploads.init().await?;

    let analysis = &app_config.analysis;
    let identifier: Arc<dyn TrackIdentifier> = match &analysis.audd_api_key {
        Some(api_key) => {
            info!("Audio identification via {}", analysis.audd_endpoint);
            Arc::new(AuddIdentifier::new(
                AuddSettings {
                    api_key: api_key.clone(),
                    endpoint: analysis.audd_endpoint.clone(),
                    timeout: analysis.timeouts.identification,
                    retry: analysis.retry.clone(),
                },
                &app_config.uploads_dir,
            )?)
        }
        None => Arc::new(DisabledIdentifier::new()),
    };

    let analyzer = Arc::new(
        SongAnalyzer::new(
            uploads,
            identifier,
            Arc::new(PlaceholderFeatureDetector),
            Arc::new(MockEnrichmentProvider),
        )
        .with_timeouts(analysis.analyzer_timeouts()),
    );

    let library_db_path = app_config.library_db_path();
    if !library_db_path.exists() {
        info!("Creating new library database at {:?}", library_db_path);
    }
    let library_store = Arc::new(SqliteLibraryStore::new(&library_db_path)?);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        default_owner_id: app_config.default_owner_id.clone(),
        max_upload_bytes: app_config.max_upload_bytes,
    };

    run_server(
        server_config,
        app_config.metrics_port,
        analyzer,
        library_store,
    )
    .await
}
