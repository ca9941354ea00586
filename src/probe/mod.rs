pub mod orchestrator;
pub mod scheduler;

use std::sync::Arc;

use tracing::{info, warn};

pub use orchestrator::{StreamChecker, check_url, probe_station};
pub use scheduler::{Scheduler, StationProbe};

use crate::context::ProbeContext;
use crate::report::Reporter;
use crate::station::StationSource;
use crate::summary::RunSummary;

/// Probes every station `source` yields and feeds `reporter` as results arrive.
///
/// Documents that cannot be loaded are skipped and counted. Returns the
/// final summary, which has also been handed to the reporter.
pub async fn run<S, R>(ctx: &ProbeContext, source: &S, reporter: &mut R) -> RunSummary
where
    S: StationSource + ?Sized,
    R: Reporter + ?Sized,
{
    let mut entries = Vec::new();
    for document in source.load() {
        match document {
            Ok(document) => {
                for warning in &document.warnings {
                    warn!(origin = %document.origin, station = %warning.station, "{}", warning.reason);
                }
                ctx.summary.add_skipped_entries(document.warnings.len());
                ctx.summary
                    .add_stations(document.entries.len() + document.warnings.len());
                entries.extend(document.entries);
            }
            Err(err) => {
                warn!(error = %err, "skipping station document");
                ctx.summary.add_failed_document();
            }
        }
    }

    info!(
        stations = entries.len(),
        concurrency = ctx.settings.concurrency_limit,
        "checking stations"
    );

    let scheduler = Scheduler::new(ctx.settings.concurrency_limit, ctx.cancel.clone());
    let mut results = scheduler.spawn(Arc::new(StreamChecker::new(ctx.clone())), entries);
    while let Some(result) = results.recv().await {
        ctx.summary.add_outcome(result.valid);
        reporter.report_result(&result);
    }

    let summary = ctx.summary.finish();
    info!(
        urls = summary.total_urls,
        ok = summary.successful_checks,
        failed = summary.failed_checks,
        "run finished"
    );
    reporter.report_summary(&summary);
    summary
}
