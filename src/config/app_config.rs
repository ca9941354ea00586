use std::env;
use std::path::PathBuf;

use super::ConfigError;
use super::probe_config::ProbeSettings;

const DEFAULT_CONFIG_FILE: &str = "radioprobe.yml";

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    JsonLines,
}

pub struct AppConfig {
    pub settings: ProbeSettings,
    pub stations_dir: PathBuf,
    pub report_format: ReportFormat,
    pub disable_emoji: bool,
    pub verbose: bool,
}

/// Load the application configuration from a YAML file and environment variables.
/// The YAML file is named by `CONFIG_FILE` and holds the probe settings. When
/// `CONFIG_FILE` is not set, a missing `radioprobe.yml` simply means defaults.
/// `STATIONS_DIR`, `REPORT_FORMAT`, `DISABLE_EMOJI` and `VERBOSE` select what
/// to scan and how to print it.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(|key| env::var(key).ok())
}

/// Same as [`load_config`], reading variables through `lookup`.
pub fn load_config_from<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let explicit_file = lookup("CONFIG_FILE");
    let config_file_location =
        PathBuf::from(explicit_file.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string()));

    let settings = match std::fs::read_to_string(&config_file_location) {
        Ok(yaml) => ProbeSettings::from_yaml(&yaml)?,
        Err(e) if explicit_file.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %config_file_location.display(), "No config file, using defaults");
            ProbeSettings::default()
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: config_file_location,
                source,
            });
        }
    };

    let stations_dir = PathBuf::from(lookup("STATIONS_DIR").unwrap_or_else(|| ".".to_string()));

    let report_format = match lookup("REPORT_FORMAT").as_deref().map(str::trim) {
        None | Some("") | Some("text") => ReportFormat::Text,
        Some("json") => ReportFormat::JsonLines,
        Some(other) => {
            return Err(ConfigError::invalid(format!(
                "REPORT_FORMAT must be `text` or `json`, got `{other}`"
            )));
        }
    };

    tracing::info!(
        stations_dir = %stations_dir.display(),
        concurrency = settings.concurrency_limit,
        "Configuration loaded"
    );

    Ok(AppConfig {
        settings,
        stations_dir,
        report_format,
        disable_emoji: flag(lookup("DISABLE_EMOJI")),
        verbose: flag(lookup("VERBOSE")),
    })
}

fn flag(value: Option<String>) -> bool {
    matches!(
        value.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_reads_yaml_and_env() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "concurrency_limit: 5").expect("write yaml");

        let path = file.path().to_string_lossy().to_string();
        let config = load_config_from(lookup_from(&[
            ("CONFIG_FILE", path.as_str()),
            ("STATIONS_DIR", "/srv/stations"),
            ("REPORT_FORMAT", "json"),
            ("DISABLE_EMOJI", "true"),
        ]))
        .expect("config");

        assert_eq!(config.settings.concurrency_limit, 5);
        assert_eq!(config.stations_dir, PathBuf::from("/srv/stations"));
        assert_eq!(config.report_format, ReportFormat::JsonLines);
        assert!(config.disable_emoji);
        assert!(!config.verbose);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = load_config_from(lookup_from(&[(
            "CONFIG_FILE",
            "/definitely/not/here/radioprobe.yml",
        )]));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_unknown_report_format() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.yml");
        std::fs::write(&path, "").expect("write yaml");
        let path = path.to_string_lossy().to_string();

        let result = load_config_from(lookup_from(&[
            ("CONFIG_FILE", path.as_str()),
            ("REPORT_FORMAT", "xml"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
