use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use super::PlaylistFormat;
use super::parser::{detect_format, parse, resolve_entries};
use crate::context::ProbeContext;
use crate::error::ProbeError;
use crate::http_probe::client::playlist_client;
use crate::http_probe::report;

/// What a playlist URL turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Absolute stream URLs, in playlist order.
    Leaves(Vec<String>),
    /// A segmented HLS playlist; accepted as is.
    Hls { content_type: Option<String> },
}

/// Downloads the playlist at `url` and expands it.
///
/// The format comes from the URL suffix or Content-Type, falling back to
/// sniffing the first lines of the body. Entries are resolved against the
/// address the playlist was served from.
pub async fn resolve_playlist(ctx: &ProbeContext, url: &str) -> Result<Expansion, ProbeError> {
    ctx.cancellable(resolve(ctx, url)).await.and_then(|expansion| expansion)
}

async fn resolve(ctx: &ProbeContext, url: &str) -> Result<Expansion, ProbeError> {
    let settings = &ctx.settings.playlist;
    let client = playlist_client(&ctx.settings)?;

    debug!(url, "downloading playlist");
    let response = download(ctx, &client, url).await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let mime = content_type.as_deref().unwrap_or_default().to_ascii_lowercase();
    let suffix = url.to_ascii_lowercase();

    if suffix.ends_with(".m3u8") || mime.contains("mpegurl") {
        debug!(url, "HLS playlist, segments are not checked");
        return Ok(Expansion::Hls { content_type });
    }

    // every mpegurl content type was taken as HLS above
    let declared = if suffix.ends_with(".m3u") {
        Some(PlaylistFormat::M3u)
    } else if mime.contains("audio/x-scpls") || suffix.ends_with(".pls") {
        Some(PlaylistFormat::Pls)
    } else {
        None
    };

    let (format, base, body) = match declared {
        Some(format) => {
            let base = response.url().clone();
            (format, base, read_body(response, settings.max_bytes, None).await?)
        }
        None => {
            let head = read_body(response, settings.max_bytes, Some(settings.detect_lines)).await?;
            let format = detect_format(&head).ok_or(ProbeError::UnsupportedPlaylistFormat)?;
            debug!(url, ?format, "auto-detected playlist format");

            // the head consumed part of the body, so fetch it again
            let response = download(ctx, &client, url).await?;
            let base = response.url().clone();
            (format, base, read_body(response, settings.max_bytes, None).await?)
        }
    };

    let leaves = expand(&base, format, &body);
    if leaves.is_empty() {
        debug!(url, "empty playlist");
        ctx.summary.add_empty_playlist();
        return Err(ProbeError::EmptyPlaylist);
    }

    debug!(url, count = leaves.len(), "playlist expanded");
    Ok(Expansion::Leaves(leaves))
}

fn expand(base: &Url, format: PlaylistFormat, body: &str) -> Vec<String> {
    resolve_entries(base, &parse(format, body))
}

async fn download(ctx: &ProbeContext, client: &Client, url: &str) -> Result<Response, ProbeError> {
    let response = client.get(url).send().await.map_err(|e| {
        let message = report(&e.without_url());
        ctx.summary.record_error(&message);
        ProbeError::playlist_download(message)
    })?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ProbeError::playlist_download(format!("HTTP {}", status.as_u16())));
    }
    Ok(response)
}

/// Reads at most `max_bytes` of the body, or only its first `max_lines`
/// lines when a line limit is given.
async fn read_body(
    mut response: Response,
    max_bytes: usize,
    max_lines: Option<usize>,
) -> Result<String, ProbeError> {
    let mut body = Vec::new();

    while body.len() < max_bytes && !has_lines(&body, max_lines) {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(e) => return Err(ProbeError::playlist_download(report(&e.without_url()))),
        }
    }
    body.truncate(max_bytes);

    if body.contains(&0) {
        return Err(ProbeError::PlaylistParse {
            reason: "body looks binary".to_string(),
        });
    }

    let text = String::from_utf8_lossy(&body);
    Ok(match max_lines {
        Some(limit) => text.lines().take(limit).collect::<Vec<_>>().join("\n"),
        None => text.into_owned(),
    })
}

fn has_lines(body: &[u8], max_lines: Option<usize>) -> bool {
    max_lines.is_some_and(|limit| body.iter().filter(|&&b| b == b'\n').count() >= limit)
}
