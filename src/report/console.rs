use std::io::{self, Write};

use unicode_truncate::UnicodeTruncateStr;

use super::Reporter;
use crate::http_probe::result::ProbeResult;
use crate::summary::RunSummary;

const BUCKET_WIDTH: usize = 27;

fn to_fixed_width(input: &str, width: usize) -> String {
    let (truncated, _) = input.unicode_truncate(width);
    format!("{:<width$}", truncated, width = width)
}

/// Human readable output: one line per result, then the summary tables.
pub struct ConsoleReporter<W: Write> {
    out: W,
    emoji: bool,
    verbose: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(emoji: bool, verbose: bool) -> Self {
        Self::new(io::stdout(), emoji, verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, emoji: bool, verbose: bool) -> Self {
        Self { out, emoji, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        let counters = [
            ("📊", "Total Stations Processed", summary.total_stations),
            ("🔗", "Total URLs Checked", summary.total_urls),
            ("✅", "Successful Checks", summary.successful_checks),
            ("❌", "Failed Checks", summary.failed_checks),
            ("📻", "ICY Streams Detected", summary.icy_stream_count),
            ("📃", "Playlists Processed", summary.playlist_count),
            ("0️⃣ ", "Empty Playlists", summary.empty_playlists),
            ("⏱️ ", "Timeout Errors", summary.timeout_errors),
            ("🔒", "TLS Errors", summary.tls_errors),
            ("⚠️ ", "Skipped Entries", summary.skipped_entries),
            ("📁", "Unreadable Files", summary.failed_documents),
        ];

        let icon = |emoji: &'static str| if self.emoji { emoji } else { "" };

        writeln!(self.out, "\n--- Summary ---")?;
        for (emoji, label, count) in counters {
            writeln!(self.out, "{} {}: {}", icon(emoji), label, count)?;
        }
        if let Some(finished_at) = summary.finished_at {
            let elapsed = finished_at - summary.started_at;
            writeln!(
                self.out,
                "{} Elapsed: {:.1}s",
                icon("⏲️ "),
                elapsed.num_milliseconds() as f64 / 1000.0
            )?;
        }

        writeln!(self.out, "\nHTTP Error Counts:")?;
        writeln!(self.out, "  -------------------")?;
        writeln!(self.out, "  Status Code | Count")?;
        writeln!(self.out, "  -------------------")?;
        for (code, count) in &summary.http_error_counts {
            writeln!(self.out, "  {:>11} | {:>5}", code, count)?;
        }
        writeln!(self.out, "  -------------------")?;

        writeln!(self.out, "\nOther Errors:")?;
        writeln!(self.out, "  -----------------------------------------")?;
        writeln!(self.out, "  {} | Count", to_fixed_width("Error Type", BUCKET_WIDTH - 1))?;
        writeln!(self.out, "  -----------------------------------------")?;
        let read_tcp = summary.read_tcp_count();
        if read_tcp > 0 {
            writeln!(
                self.out,
                "  {} | {:>5}",
                to_fixed_width("read tcp (consolidated)", BUCKET_WIDTH),
                read_tcp
            )?;
        }
        for (bucket, detail) in summary.other_errors_without_read_tcp() {
            // verbose mode shows the latest full message, untruncated
            let label = if self.verbose {
                format!("{:<width$}", detail.full_error, width = BUCKET_WIDTH)
            } else {
                to_fixed_width(bucket, BUCKET_WIDTH)
            };
            writeln!(self.out, "  {} | {:>5}", label, detail.count)?;
        }
        writeln!(self.out, "  -----------------------------------------")?;

        writeln!(self.out, "\n---------------")?;
        writeln!(self.out, "{}Done!", if self.emoji { "✨ " } else { "" })?;
        self.out.flush()
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report_result(&mut self, result: &ProbeResult) {
        let line = if result.valid {
            format!(
                "{}OK {} - {}",
                if self.emoji { "✅ " } else { "" },
                result.station_name,
                result.content_type.as_deref().unwrap_or_default()
            )
        } else {
            format!(
                "{}BAD {} - {} - {}",
                if self.emoji { "❌ " } else { "" },
                result.station_name,
                result.error_message(),
                result.url
            )
        };
        let _ = writeln!(self.out, "{line}");
        if self.verbose {
            for note in &result.notes {
                let _ = writeln!(self.out, "    note: {note}");
            }
        }
    }

    fn report_summary(&mut self, summary: &RunSummary) {
        let _ = self.write_summary(summary);
    }
}
