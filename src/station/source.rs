use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{StationDocument, StationEntry, StationError, StationSource, StationWarning};

/// Directory at the top of the tree holding stations already known to be dead.
const DEAD_STATION_DIR: &str = "deadStation";

/// Reads every `.json` file below a directory, in path order.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    root: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<Result<PathBuf, StationError>>) {
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(source) => {
                out.push(Err(StationError::Walk {
                    path: dir.to_path_buf(),
                    source,
                }));
                return;
            }
        };

        let mut paths: Vec<PathBuf> = listing.filter_map(|entry| entry.ok()).map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                if dir == self.root && path.file_name().is_some_and(|name| name == DEAD_STATION_DIR) {
                    debug!(path = %path.display(), "skipping dead station directory");
                    continue;
                }
                self.collect(&path, out);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                out.push(Ok(path));
            }
        }
    }
}

impl StationSource for JsonDirectorySource {
    fn load(&self) -> Vec<Result<StationDocument, StationError>> {
        let mut files = Vec::new();
        self.collect(&self.root, &mut files);

        files
            .into_iter()
            .map(|file| {
                let path = file?;
                debug!(path = %path.display(), "processing station file");
                let text = fs::read_to_string(&path).map_err(|source| StationError::Read {
                    path: path.clone(),
                    source,
                })?;
                parse_station_document(&path.display().to_string(), &text)
            })
            .collect()
    }
}

/// Parses `{"stations": {"<name>": "<url>", ...}}`.
///
/// Stations whose value is not a string become warnings.
pub fn parse_station_document(origin: &str, text: &str) -> Result<StationDocument, StationError> {
    let value: Value = serde_json::from_str(text).map_err(|source| StationError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    let Some(stations) = value.get("stations").and_then(Value::as_object) else {
        return Err(StationError::MissingStations {
            origin: origin.to_string(),
        });
    };

    let mut document = StationDocument {
        origin: origin.to_string(),
        ..Default::default()
    };
    for (name, url) in stations {
        match url.as_str() {
            Some(url) => document.entries.push(StationEntry::new(name.as_str(), url)),
            None => document.warnings.push(StationWarning {
                station: name.clone(),
                reason: format!("Invalid URL format for {name}"),
            }),
        }
    }
    Ok(document)
}
