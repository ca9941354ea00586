pub mod app_config;
pub mod probe_config;

pub use app_config::{AppConfig, ReportFormat, load_config};
pub use probe_config::{
    HttpSettings, IcySettings, InsecurePolicy, MAX_TIMEOUT_SECONDS, PlaylistSettings,
    ProbeSettings, RetryPolicy, TlsSettings,
};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}

impl ConfigError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
