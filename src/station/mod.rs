//! Station definitions: where the probe run gets its (name, URL) pairs.

pub mod source;

use std::path::PathBuf;

pub use source::{JsonDirectorySource, parse_station_document};

/// One station to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationEntry {
    pub name: String,
    pub url: String,
}

impl StationEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// An entry that could not be used, e.g. a station whose URL is not a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationWarning {
    pub station: String,
    pub reason: String,
}

/// The stations read from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationDocument {
    pub origin: String,
    pub entries: Vec<StationEntry>,
    pub warnings: Vec<StationWarning>,
}

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stations found in {origin}")]
    MissingStations { origin: String },

    #[error("cannot list {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies station documents to a probe run.
///
/// A failing document is reported on its own and does not stop the others.
pub trait StationSource {
    fn load(&self) -> Vec<Result<StationDocument, StationError>>;
}

/// A fixed list of entries, handy for embedding and tests.
impl StationSource for Vec<StationEntry> {
    fn load(&self) -> Vec<Result<StationDocument, StationError>> {
        vec![Ok(StationDocument {
            origin: "inline".to_string(),
            entries: self.clone(),
            warnings: Vec::new(),
        })]
    }
}
