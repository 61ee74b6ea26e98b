use super::RequestsLoggingLevel;
use crate::config::{DEFAULT_MAX_UPLOAD_MB, DEFAULT_OWNER_ID};
use crate::library::OwnerId;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    /// Owner used by library requests that do not name one.
    pub default_owner_id: OwnerId,
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            default_owner_id: OwnerId::parse(DEFAULT_OWNER_ID)
                .expect("Default owner id must be valid"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}
