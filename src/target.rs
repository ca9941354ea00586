//! Cheap, purely textual classification of station URLs.
//!
//! Nothing in here touches the network; the heuristics only decide which
//! probe to try first.

use url::Url;

/// Playlist flavours recognised from the URL suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    M3u,
    /// UTF-8 / HLS flavour of M3U.
    M3u8,
    Pls,
}

/// Prepends `http://` unless the URL already carries an http(s) scheme.
pub fn normalize_scheme(url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

pub fn is_https(url: &str) -> bool {
    url.to_ascii_lowercase().starts_with("https://")
}

pub fn classify_playlist(url: &str) -> Option<PlaylistKind> {
    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".m3u8") {
        Some(PlaylistKind::M3u8)
    } else if lower.ends_with(".m3u") {
        Some(PlaylistKind::M3u)
    } else if lower.ends_with(".pls") {
        Some(PlaylistKind::Pls)
    } else {
        None
    }
}

/// Guesses whether the URL points at a Shoutcast/Icecast mount.
///
/// Shoutcast v1 servers are usually addressed as `http://host:port/;` and
/// mounts rarely carry a file extension. Both false positives and false
/// negatives happen; callers always fall back to plain HTTP.
pub fn is_likely_icy(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with("/;") || !last_segment(&lower).contains('.')
}

// Last slash-separated element, trailing slashes ignored.
fn last_segment(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// `host:port` to dial, with the scheme's default port filled in.
pub fn socket_address(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let port = parsed
        .port()
        .unwrap_or(if parsed.scheme() == "https" { 443 } else { 80 });
    Some(format!("{host}:{port}"))
}

/// Value for the `Host` header: the host plus the port when one was given.
pub fn host_header(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
