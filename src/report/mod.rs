//! Turning probe results and the run summary into output.

pub mod console;
pub mod json;

pub use console::ConsoleReporter;
pub use json::JsonLinesReporter;

use crate::http_probe::result::ProbeResult;
use crate::summary::RunSummary;

/// Receives every result as it arrives and the summary once at the end.
pub trait Reporter {
    fn report_result(&mut self, result: &ProbeResult);
    fn report_summary(&mut self, summary: &RunSummary);
}
