use std::process::ExitCode;

use radioprobe::config::{ReportFormat, load_config};
use radioprobe::report::{ConsoleReporter, JsonLinesReporter};
use radioprobe::station::JsonDirectorySource;
use radioprobe::{ProbeContext, run};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let ctx = ProbeContext::with_cancel(config.settings, cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing running probes");
            cancel.cancel();
        }
    });

    let source = JsonDirectorySource::new(&config.stations_dir);
    match config.report_format {
        ReportFormat::Text => {
            println!("Checking stations...");
            let mut reporter = ConsoleReporter::stdout(!config.disable_emoji, config.verbose);
            run(&ctx, &source, &mut reporter).await;
        }
        ReportFormat::JsonLines => {
            let mut reporter = JsonLinesReporter::stdout();
            run(&ctx, &source, &mut reporter).await;
        }
    }

    if ctx.cancel.is_cancelled() {
        ExitCode::from(130)
    } else {
        ExitCode::SUCCESS
    }
}
