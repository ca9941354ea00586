use std::io::{self, Write};

use serde::Serialize;
use tracing::warn;

use super::Reporter;
use crate::http_probe::result::ProbeResult;
use crate::summary::RunSummary;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Line<'a> {
    Result(&'a ProbeResult),
    Summary(&'a RunSummary),
}

/// Machine readable output: one JSON object per line.
pub struct JsonLinesReporter<W: Write> {
    out: W,
}

impl JsonLinesReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: &Line<'_>) {
        let written = serde_json::to_writer(&mut self.out, line)
            .map_err(io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"));
        if let Err(e) = written {
            warn!(error = %e, "cannot write report line");
        }
    }
}

impl<W: Write> Reporter for JsonLinesReporter<W> {
    fn report_result(&mut self, result: &ProbeResult) {
        self.emit(&Line::Result(result));
    }

    fn report_summary(&mut self, summary: &RunSummary) {
        self.emit(&Line::Summary(summary));
        let _ = self.out.flush();
    }
}
