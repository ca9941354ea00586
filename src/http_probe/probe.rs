use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use super::client::{RedirectTracker, TooManyRedirects, stream_client};
use super::prelude::*;
use super::{chain, is_tls_failure, report};
use crate::context::ProbeContext;
use crate::error::ProbeError;
use crate::icy_probe::probe_icy;
use crate::summary::Summary;
use crate::target::is_likely_icy;

const OCTET_STREAM: &str = "application/octet-stream";

/// Probes a stream URL with a single HTTP GET, retrying per the configured
/// policy. `profile` pins the TLS configuration for `https` targets.
///
/// A status in `200..400` means the stream is alive. When the request was
/// redirected to something that looks like an ICY endpoint and the attempt
/// failed, the target is checked over raw ICY instead.
pub async fn probe_http(
    ctx: &ProbeContext,
    url: &str,
    station_name: &str,
    profile: Option<&TlsProfile>,
) -> ProbeResult {
    let tracker = RedirectTracker::new(url);
    let client = match stream_client(&ctx.settings, profile, &tracker) {
        Ok(client) => client,
        Err(err) => {
            if err.is_tls() {
                ctx.summary.add_tls_error();
            }
            debug!(url, error = %err, "cannot build HTTP client");
            return ProbeResult::failed(station_name, url, err);
        }
    };

    let retry = &ctx.settings.retry;
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let target = tracker.last_url();
        debug!(
            url = %target,
            station = station_name,
            profile = profile.map(|p| p.name).unwrap_or("plain"),
            attempt = attempt + 1,
            "HTTP probe"
        );
        let result = attempt_once(ctx, &client, &tracker, &target, station_name).await;
        attempt += 1;

        let Some(error) = result.error.as_ref() else {
            return result;
        };

        let redirected_to = tracker.last_url();
        let reroutable = !matches!(
            error,
            ProbeError::Cancelled | ProbeError::TooManyRedirects | ProbeError::HttpStatus(_)
        );
        if reroutable && tracker.redirected() && is_likely_icy(&redirected_to) {
            debug!(url = %redirected_to, "redirected to a likely ICY stream");
            return probe_icy(ctx, &redirected_to, station_name).await;
        }

        if !error.is_retryable() || attempt >= max_attempts {
            return result;
        }

        if let Err(cancelled) = ctx.sleep(retry.delay_after(attempt - 1)).await {
            return ProbeResult::failed(station_name, &redirected_to, cancelled);
        }
    }
}

async fn attempt_once(
    ctx: &ProbeContext,
    client: &Client,
    tracker: &RedirectTracker,
    url: &str,
    station_name: &str,
) -> ProbeResult {
    let response = match ctx.cancellable(client.get(url).send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            let last_url = tracker.last_url();
            let error = classify_transport_error(&ctx.summary, err, &last_url);
            debug!(url = %last_url, error = %error, "HTTP request failed");
            return ProbeResult::failed(station_name, &last_url, error);
        }
        Err(cancelled) => return ProbeResult::failed(station_name, &tracker.last_url(), cancelled),
    };

    let final_url = response.url().to_string();
    let status = response.status().as_u16();
    if !(200..400).contains(&status) {
        ctx.summary.add_http_status(status);
        return ProbeResult::failed(station_name, &final_url, ProbeError::HttpStatus(status));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    // the body is a live stream; never read it
    drop(response);

    let mut result = ProbeResult::ok(station_name, &final_url, content_type);

    let opaque = result
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(OCTET_STREAM));
    if opaque || is_likely_icy(&final_url) {
        let icy = probe_icy(ctx, &final_url, station_name).await;
        if icy.valid && icy.content_type.is_some() {
            result.content_type = icy.content_type;
        }
    }

    result
}

/// Maps a reqwest failure to a [`ProbeError`] and counts it in the summary.
fn classify_transport_error(summary: &Summary, err: reqwest::Error, url: &str) -> ProbeError {
    let err = err.without_url();
    let message = report(&err);

    if err.is_timeout() {
        summary.add_timeout_error();
        return ProbeError::Timeout;
    }

    if err.is_redirect() && chain(&err).any(|e| e.is::<TooManyRedirects>()) {
        summary.update_other_errors("Too Many Redirects", &message);
        return ProbeError::TooManyRedirects;
    }

    if message.to_lowercase().contains("scheme") {
        summary.update_other_errors("Unsupported Protocol", &message);
        return ProbeError::UnsupportedProtocolScheme {
            url: url.to_string(),
        };
    }

    if err.is_builder() {
        return ProbeError::InvalidUrl { reason: message };
    }

    if is_tls_failure(&err, &message) {
        summary.add_tls_error();
        return ProbeError::tls(message);
    }

    let bucket = summary.record_error(&message);
    ProbeError::Other { bucket, message }
}
