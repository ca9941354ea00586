use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36";

/// Upper bound for every configurable timeout, in seconds.
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

/// Tunables for a probe run, read from the YAML file named by `CONFIG_FILE`.
/// Every field has a default, so an empty (or missing) file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// Maximum number of station entries probed at the same time.
    pub concurrency_limit: usize,

    /// User agent sent with HTTP requests; many stream hosts reject
    /// requests that do not look like a browser.
    pub user_agent: String,

    /// Redirect hops followed before an attempt fails.
    pub max_redirects: usize,

    pub http: HttpSettings,
    pub icy: IcySettings,
    pub playlist: PlaylistSettings,
    pub retry: RetryPolicy,
    pub tls: TlsSettings,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 75,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: 10,
            http: HttpSettings::default(),
            icy: IcySettings::default(),
            playlist: PlaylistSettings::default(),
            retry: RetryPolicy::default(),
            tls: TlsSettings::default(),
        }
    }
}

impl ProbeSettings {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yaml yields Null for an empty document
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: ProbeSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::invalid("concurrency_limit must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid("retry.max_attempts must be at least 1"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::invalid("retry.multiplier must be >= 1.0"));
        }
        if self.playlist.detect_lines == 0 {
            return Err(ConfigError::invalid("playlist.detect_lines must be at least 1"));
        }
        if self.http.request_timeout_seconds == 0 || self.playlist.request_timeout_seconds == 0 {
            return Err(ConfigError::invalid("request timeouts must be at least one second"));
        }
        let timeouts = [
            ("http.request_timeout_seconds", self.http.request_timeout_seconds),
            ("http.connect_timeout_seconds", self.http.connect_timeout_seconds),
            ("http.pool_idle_timeout_seconds", self.http.pool_idle_timeout_seconds),
            ("http.tcp_keepalive_seconds", self.http.tcp_keepalive_seconds),
            ("icy.connect_timeout_seconds", self.icy.connect_timeout_seconds),
            ("icy.deadline_seconds", self.icy.deadline_seconds),
            ("playlist.request_timeout_seconds", self.playlist.request_timeout_seconds),
            ("playlist.connect_timeout_seconds", self.playlist.connect_timeout_seconds),
        ];
        for (name, seconds) in timeouts {
            if seconds > MAX_TIMEOUT_SECONDS {
                return Err(ConfigError::invalid(format!(
                    "{name} must be at most {MAX_TIMEOUT_SECONDS}"
                )));
            }
        }
        if self.retry.max_delay_ms > MAX_TIMEOUT_SECONDS * 1000 {
            return Err(ConfigError::invalid(format!(
                "retry.max_delay_ms must be at most {}",
                MAX_TIMEOUT_SECONDS * 1000
            )));
        }
        Ok(())
    }
}

/// HTTP client settings for stream probes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub pool_idle_timeout_seconds: u64,
    pub pool_max_idle_per_host: usize,
    pub tcp_keepalive_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 10,
            connect_timeout_seconds: 10,
            pool_idle_timeout_seconds: 90,
            pool_max_idle_per_host: 100,
            tcp_keepalive_seconds: 30,
        }
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Raw socket settings for the ICY probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IcySettings {
    pub connect_timeout_seconds: u64,
    /// Deadline for the whole exchange once connected.
    pub deadline_seconds: u64,
}

impl Default for IcySettings {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: 10,
            deadline_seconds: 15,
        }
    }
}

impl IcySettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }
}

/// Playlist downloads use their own, shorter limits: playlists are small.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    /// Lines peeked when the format has to be sniffed from the body.
    pub detect_lines: usize,
    pub max_bytes: usize,
    /// How deep playlists that list other playlists are expanded.
    pub max_depth: usize,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 5,
            connect_timeout_seconds: 5,
            detect_lines: 5,
            max_bytes: 1024 * 1024,
            max_depth: 2,
        }
    }
}

impl PlaylistSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Exponential backoff between attempts of the same HTTP probe.
///
/// The default is a single attempt.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (zero based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_ms = (self.base_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(delay_ms as u64)
    }
}

/// Where the certificate-ignoring profile sits in the TLS ladder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsecurePolicy {
    /// Never skip certificate verification.
    #[default]
    Disabled,
    /// Try the insecure profile after every verifying profile failed.
    LastResort,
    /// Try the insecure profile before anything else. Maximises reachability
    /// at the cost of never validating certificates on reachable hosts.
    First,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    pub insecure: InsecurePolicy,
}
