use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub uploads_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub default_owner_id: Option<String>,
    pub max_upload_mb: Option<u64>,

    pub analysis: Option<AnalysisConfig>,
}

/// `[analysis]` table: dependency timeouts and the fingerprinting service.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub audd_api_key: Option<String>,
    pub audd_endpoint: Option<String>,
    pub identification_timeout_secs: Option<u64>,
    pub detection_timeout_secs: Option<u64>,
    pub enrichment_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/data"
            port = 4000
            logging_level = "headers"
            default_owner_id = "guest"

            [analysis]
            audd_endpoint = "http://localhost:9999/"
            identification_timeout_secs = 5
            max_retries = 0
            backoff_multiplier = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/data"));
        assert_eq!(config.port, Some(4000));
        assert_eq!(config.default_owner_id.as_deref(), Some("guest"));
        assert!(config.uploads_dir.is_none());

        let analysis = config.analysis.unwrap();
        assert_eq!(analysis.audd_endpoint.as_deref(), Some("http://localhost:9999/"));
        assert_eq!(analysis.identification_timeout_secs, Some(5));
        assert_eq!(analysis.max_retries, Some(0));
        assert_eq!(analysis.backoff_multiplier, Some(1.5));
        assert!(analysis.detection_timeout_secs.is_none());
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.analysis.is_none());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/tabgeni.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
