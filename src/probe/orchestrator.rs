use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use super::scheduler::StationProbe;
use crate::context::ProbeContext;
use crate::error::ProbeError;
use crate::http_probe::prelude::*;
use crate::icy_probe::probe_icy;
use crate::playlist::{Expansion, HLS_NOTE, resolve_playlist};
use crate::station::StationEntry;
use crate::target::{classify_playlist, is_https, is_likely_icy, normalize_scheme};

/// Checks one stream URL and returns its single verdict.
///
/// Likely ICY endpoints get the raw ICY probe first. If that does not
/// confirm a stream the URL still goes through HTTP, and the ICY failure
/// is kept as a note on the final result.
pub async fn check_url(ctx: &ProbeContext, url: &str, station_name: &str) -> ProbeResult {
    ctx.summary.add_url();

    if url.trim().is_empty() {
        ctx.summary.update_other_errors("Empty URL", "Empty URL");
        return ProbeResult::failed(station_name, url, ProbeError::EmptyUrl);
    }

    let url = normalize_scheme(url);
    debug!(url = %url, station = station_name, "checking URL");

    let mut icy_note = None;
    if is_likely_icy(&url) {
        let icy = probe_icy(ctx, &url, station_name).await;
        if icy.valid {
            return icy;
        }
        if icy.error == Some(ProbeError::Cancelled) {
            return icy;
        }
        icy_note = Some(format!("ICY check: {}", icy.error_message()));
    }

    let result = if is_https(&url) {
        probe_tls_ladder(ctx, &url, station_name).await
    } else {
        probe_http(ctx, &url, station_name, None).await
    };

    match icy_note {
        Some(note) => result.with_note(note),
        None => result,
    }
}

/// Probes everything behind one station entry, sending one result per leaf.
///
/// Playlist URLs are expanded and their entries checked one after another;
/// entries that are playlists themselves are expanded up to the configured
/// depth.
pub async fn probe_station(ctx: &ProbeContext, entry: &StationEntry, results: &UnboundedSender<ProbeResult>) {
    let url = entry.url.trim();
    if classify_playlist(url).is_none() {
        let _ = results.send(check_url(ctx, url, &entry.name).await);
        return;
    }

    let url = normalize_scheme(url);
    expand(ctx, &url, &entry.name, 0, results).await;
}

// Boxed so the recursion has a nameable, `Send` future type.
fn expand<'a>(
    ctx: &'a ProbeContext,
    url: &'a str,
    station_name: &'a str,
    depth: usize,
    results: &'a UnboundedSender<ProbeResult>,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        ctx.summary.add_playlist();
        debug!(url, station = station_name, depth, "playlist detected");

        let leaves = match resolve_playlist(ctx, url).await {
            Ok(Expansion::Leaves(leaves)) => leaves,
            Ok(Expansion::Hls { content_type }) => {
                let result = ProbeResult::ok(station_name, url, content_type).with_note(HLS_NOTE);
                let _ = results.send(result);
                return;
            }
            Err(err) => {
                let _ = results.send(ProbeResult::failed(station_name, url, err));
                return;
            }
        };

        for leaf in leaves {
            if ctx.cancel.is_cancelled() {
                return;
            }
            if classify_playlist(&leaf).is_some() && depth < ctx.settings.playlist.max_depth {
                expand(ctx, &leaf, station_name, depth + 1, results).await;
            } else {
                let _ = results.send(check_url(ctx, &leaf, station_name).await);
            }
        }
    })
}

/// The production [`StationProbe`].
#[derive(Debug, Clone)]
pub struct StreamChecker {
    ctx: ProbeContext,
}

impl StreamChecker {
    pub fn new(ctx: ProbeContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl StationProbe for StreamChecker {
    async fn probe_station(&self, entry: &StationEntry, results: &UnboundedSender<ProbeResult>) {
        probe_station(&self.ctx, entry, results).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeSettings;
    use crate::icy_probe::probe::test_support::raw_server;
    use tokio::sync::mpsc;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> ProbeContext {
        ProbeContext::new(ProbeSettings::default())
    }

    async fn collect(ctx: &ProbeContext, entry: StationEntry) -> Vec<ProbeResult> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        probe_station(ctx, &entry, &tx).await;
        drop(tx);
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn test_empty_url() {
        let ctx = context();
        let result = check_url(&ctx, "   ", "Nothing").await;

        assert_eq!(result.error, Some(ProbeError::EmptyUrl));
        let summary = ctx.summary.snapshot();
        assert_eq!(summary.total_urls, 1);
        assert_eq!(summary.other_errors["Empty URL"].count, 1);
    }

    #[tokio::test]
    async fn test_icy_endpoint_short_circuits() {
        let (address, _) = raw_server(b"ICY 200 OK\r\ncontent-type: audio/mpeg\r\n\r\n").await;
        let ctx = context();

        // no scheme: must be normalized before the socket is opened
        let result = check_url(&ctx, &format!("{address}/;"), "Shout").await;

        assert!(result.valid, "unexpected failure: {:?}", result.error);
        assert_eq!(result.url, format!("http://{address}/;"));
        assert_eq!(ctx.summary.snapshot().icy_stream_count, 1);
    }

    #[tokio::test]
    async fn test_failed_icy_check_falls_back_to_http() {
        let server = MockServer::start().await;
        Mock::given(path("/live"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/ogg"))
            .mount(&server)
            .await;

        let ctx = context();
        let result = check_url(&ctx, &format!("{}/live", server.uri()), "Ogg").await;

        assert!(result.valid, "unexpected failure: {:?}", result.error);
        assert_eq!(result.error, None);
        assert_eq!(result.content_type.as_deref(), Some("audio/ogg"));
        assert_eq!(result.notes, vec!["ICY check: Not a valid ICY stream".to_string()]);
    }

    #[tokio::test]
    async fn test_plain_station() {
        let server = MockServer::start().await;
        Mock::given(path("/live.mp3"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let ctx = context();
        let results = collect(&ctx, StationEntry::new("Plain", format!("{}/live.mp3", server.uri()))).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].valid);
        assert!(results[0].notes.is_empty());
        assert_eq!(ctx.summary.snapshot().playlist_count, 0);
    }

    #[tokio::test]
    async fn test_playlist_station_yields_one_result_per_leaf() {
        let server = MockServer::start().await;
        let body = format!(
            "#EXTM3U\n#EXTINF:-1,High\n{uri}/high.mp3\n#EXTINF:-1,Low\n{uri}/low.mp3\n",
            uri = server.uri()
        );
        Mock::given(path("/station.m3u"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        Mock::given(path("/high.mp3"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(path("/low.mp3"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let ctx = context();
        let results = collect(&ctx, StationEntry::new("Duo", format!("{}/station.m3u", server.uri()))).await;

        assert_eq!(results.len(), 2);
        assert!(results[0].valid);
        assert_eq!(results[1].error, Some(ProbeError::HttpStatus(404)));
        let summary = ctx.summary.snapshot();
        assert_eq!(summary.playlist_count, 1);
        assert_eq!(summary.total_urls, 2);
    }

    #[tokio::test]
    async fn test_empty_playlist_station() {
        let server = MockServer::start().await;
        Mock::given(path("/empty.pls"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[playlist]\nNumberOfEntries=0\n"))
            .mount(&server)
            .await;

        let ctx = context();
        let results = collect(&ctx, StationEntry::new("Void", format!("{}/empty.pls", server.uri()))).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error_message(), "Empty playlist");
        assert_eq!(ctx.summary.snapshot().empty_playlists, 1);
    }

    #[tokio::test]
    async fn test_hls_station_is_valid_with_note() {
        let server = MockServer::start().await;
        Mock::given(path("/live/index.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("#EXTM3U\n", "application/vnd.apple.mpegurl"))
            .mount(&server)
            .await;

        let ctx = context();
        let results = collect(&ctx, StationEntry::new("Hls", format!("{}/live/index.m3u8", server.uri()))).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].valid);
        assert_eq!(results[0].error, None);
        assert_eq!(results[0].notes, vec![HLS_NOTE.to_string()]);
    }

    #[tokio::test]
    async fn test_nested_playlist_is_expanded() {
        let server = MockServer::start().await;
        Mock::given(path("/outer.pls"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[playlist]\nFile1=/inner.m3u\n"))
            .mount(&server)
            .await;
        Mock::given(path("/inner.m3u"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U\n/stream.mp3\n"))
            .mount(&server)
            .await;
        Mock::given(path("/stream.mp3"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let ctx = context();
        let results = collect(&ctx, StationEntry::new("Nested", format!("{}/outer.pls", server.uri()))).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].valid);
        assert_eq!(results[0].url, format!("{}/stream.mp3", server.uri()));
        assert_eq!(ctx.summary.snapshot().playlist_count, 2);
    }
}
