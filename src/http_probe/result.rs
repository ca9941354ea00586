use serde::{Serialize, Serializer};

use crate::error::ProbeError;

/// Outcome of one leaf probe.
///
/// `url` is the last address actually tried, so after a redirect it is the
/// redirect target rather than the configured URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub station_name: String,
    pub url: String,
    pub valid: bool,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<ProbeError>,
    pub content_type: Option<String>,
    /// Diagnostics that do not affect validity.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ProbeResult {
    pub fn ok(station_name: &str, url: &str, content_type: Option<String>) -> Self {
        Self {
            station_name: station_name.to_string(),
            url: url.to_string(),
            valid: true,
            error: None,
            content_type,
            notes: Vec::new(),
        }
    }

    pub fn failed(station_name: &str, url: &str, error: ProbeError) -> Self {
        Self {
            station_name: station_name.to_string(),
            url: url.to_string(),
            valid: false,
            error: Some(error),
            content_type: None,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The error text, empty for valid results.
    pub fn error_message(&self) -> String {
        self.error.as_ref().map(ToString::to_string).unwrap_or_default()
    }
}

fn serialize_error<S>(error: &Option<ProbeError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&error.as_ref().map(ToString::to_string).unwrap_or_default())
}
