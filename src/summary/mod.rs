pub mod classify;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

pub use classify::{READ_TCP_BUCKET, summarize_error};

/// Latest raw message and occurrence count for one error bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub full_error: String,
    pub count: usize,
}

/// Counters of a whole run, as handed to the reporter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_stations: usize,
    pub total_urls: usize,
    pub successful_checks: usize,
    pub failed_checks: usize,
    pub playlist_count: usize,
    pub empty_playlists: usize,
    pub tls_errors: usize,
    pub timeout_errors: usize,
    pub icy_stream_count: usize,
    pub skipped_entries: usize,
    pub failed_documents: usize,
    pub http_error_counts: BTreeMap<u16, usize>,
    pub other_errors: BTreeMap<String, ErrorDetail>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            total_stations: 0,
            total_urls: 0,
            successful_checks: 0,
            failed_checks: 0,
            playlist_count: 0,
            empty_playlists: 0,
            tls_errors: 0,
            timeout_errors: 0,
            icy_stream_count: 0,
            skipped_entries: 0,
            failed_documents: 0,
            http_error_counts: BTreeMap::new(),
            other_errors: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Total count of every `read tcp` style error, which reporters show
    /// as a single consolidated row.
    pub fn read_tcp_count(&self) -> usize {
        self.other_errors
            .get(READ_TCP_BUCKET)
            .map(|detail| detail.count)
            .unwrap_or(0)
    }

    /// Error buckets other than the consolidated `read tcp` one, sorted by name.
    pub fn other_errors_without_read_tcp(&self) -> impl Iterator<Item = (&String, &ErrorDetail)> {
        self.other_errors
            .iter()
            .filter(|(bucket, _)| bucket.as_str() != READ_TCP_BUCKET)
    }
}

/// Run-wide statistics shared by every probe task.
///
/// Passed around behind an `Arc`; every mutation takes the internal lock, so
/// probes on different tasks can record outcomes concurrently.
#[derive(Debug)]
pub struct Summary {
    state: Mutex<RunSummary>,
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}

impl Summary {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunSummary::new()),
        }
    }

    pub fn add_stations(&self, count: usize) {
        self.state.lock().total_stations += count;
    }

    pub fn add_url(&self) {
        self.state.lock().total_urls += 1;
    }

    pub fn add_outcome(&self, valid: bool) {
        let mut state = self.state.lock();
        if valid {
            state.successful_checks += 1;
        } else {
            state.failed_checks += 1;
        }
    }

    pub fn add_playlist(&self) {
        self.state.lock().playlist_count += 1;
    }

    pub fn add_empty_playlist(&self) {
        self.state.lock().empty_playlists += 1;
    }

    pub fn add_tls_error(&self) {
        self.state.lock().tls_errors += 1;
    }

    pub fn add_timeout_error(&self) {
        self.state.lock().timeout_errors += 1;
    }

    pub fn add_icy_stream(&self) {
        self.state.lock().icy_stream_count += 1;
    }

    pub fn add_skipped_entries(&self, count: usize) {
        self.state.lock().skipped_entries += count;
    }

    pub fn add_failed_document(&self) {
        self.state.lock().failed_documents += 1;
    }

    pub fn add_http_status(&self, status: u16) {
        *self.state.lock().http_error_counts.entry(status).or_insert(0) += 1;
    }

    /// Counts one more error in `bucket` and keeps `raw` as its latest example.
    pub fn update_other_errors(&self, bucket: &str, raw: &str) {
        let mut state = self.state.lock();
        let detail = state.other_errors.entry(bucket.to_string()).or_default();
        detail.count += 1;
        detail.full_error = raw.to_string();
    }

    /// Classifies `raw` with [`summarize_error`], records it and returns the bucket.
    pub fn record_error(&self, raw: &str) -> String {
        let bucket = summarize_error(raw);
        self.update_other_errors(&bucket, raw);
        bucket
    }

    /// Copy of the counters as they are right now.
    pub fn snapshot(&self) -> RunSummary {
        self.state.lock().clone()
    }

    /// Stamps the finish time and returns the final counters.
    pub fn finish(&self) -> RunSummary {
        let mut state = self.state.lock();
        state.finished_at = Some(Utc::now());
        state.clone()
    }
}
