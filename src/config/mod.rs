mod file_config;

pub use file_config::{AnalysisConfig, FileConfig};

use crate::analysis::{AnalysisTimeouts, RetryPolicy, DEFAULT_AUDD_ENDPOINT};
use crate::library::OwnerId;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OWNER_ID: &str = "default-user";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub uploads_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub audd_api_key: Option<String>,
    pub default_owner_id: String,
    pub max_upload_mb: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            uploads_dir: None,
            port: 3001,
            metrics_port: 9091,
            logging_level: RequestsLoggingLevel::default(),
            audd_api_key: None,
            default_owner_id: DEFAULT_OWNER_ID.to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub default_owner_id: OwnerId,
    pub max_upload_bytes: u64,

    pub analysis: AnalysisSettings,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Identification is disabled when unset.
    pub audd_api_key: Option<String>,
    pub audd_endpoint: String,
    pub timeouts: AnalysisTimeouts,
    pub retry: RetryPolicy,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            audd_api_key: None,
            audd_endpoint: DEFAULT_AUDD_ENDPOINT.to_string(),
            timeouts: AnalysisTimeouts::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AnalysisSettings {
    /// Deadlines for the analyzer. `timeouts.identification` bounds one AudD
    /// attempt; the analyzer waits for the whole retry sequence.
    pub fn analyzer_timeouts(&self) -> AnalysisTimeouts {
        AnalysisTimeouts {
            identification: self.retry.total_budget(self.timeouts.identification),
            ..self.timeouts.clone()
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let uploads_dir = file
            .uploads_dir
            .map(PathBuf::from)
            .or_else(|| cli.uploads_dir.clone())
            .unwrap_or_else(|| db_dir.join("uploads"));
        if uploads_dir.exists() && !uploads_dir.is_dir() {
            bail!("uploads_dir is not a directory: {:?}", uploads_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port && port != 0 {
            bail!("port and metrics_port must differ (both are {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let raw_owner = file
            .default_owner_id
            .unwrap_or_else(|| cli.default_owner_id.clone());
        let default_owner_id = OwnerId::parse(&raw_owner)
            .map_err(|_| anyhow::anyhow!("Invalid default owner id: {:?}", raw_owner))?;

        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        if max_upload_mb == 0 {
            bail!("max_upload_mb must be greater than zero");
        }
        let max_upload_bytes = max_upload_mb * 1024 * 1024;

        // Analysis settings - merge file config with defaults
        let analysis_file = file.analysis.unwrap_or_default();
        let defaults = AnalysisSettings::default();
        let audd_api_key = analysis_file
            .audd_api_key
            .or_else(|| cli.audd_api_key.clone())
            .filter(|key| !key.trim().is_empty());
        let analysis = AnalysisSettings {
            audd_api_key,
            audd_endpoint: analysis_file
                .audd_endpoint
                .unwrap_or(defaults.audd_endpoint),
            timeouts: AnalysisTimeouts {
                identification: analysis_file
                    .identification_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeouts.identification),
                detection: analysis_file
                    .detection_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeouts.detection),
                enrichment: analysis_file
                    .enrichment_timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeouts.enrichment),
            },
            retry: RetryPolicy {
                max_retries: analysis_file
                    .max_retries
                    .unwrap_or(defaults.retry.max_retries),
                initial_backoff: analysis_file
                    .initial_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.initial_backoff),
                max_backoff: analysis_file
                    .max_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry.max_backoff),
                backoff_multiplier: analysis_file
                    .backoff_multiplier
                    .unwrap_or(defaults.retry.backoff_multiplier),
            },
        };

        Ok(Self {
            db_dir,
            uploads_dir,
            port,
            metrics_port,
            logging_level,
            default_owner_id,
            max_upload_bytes,
            analysis,
        })
    }

    pub fn library_db_path(&self) -> PathBuf {
        self.db_dir.join("library.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
