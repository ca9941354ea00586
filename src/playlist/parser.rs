use url::Url;

use super::PlaylistFormat;

const BOM: char = '\u{feff}';

/// Guesses the format from the start of a body.
pub fn detect_format(head: &str) -> Option<PlaylistFormat> {
    let head = head.trim_start_matches(BOM);
    if head.starts_with("#EXTM3U") {
        Some(PlaylistFormat::M3u)
    } else if head.contains("[playlist]") {
        Some(PlaylistFormat::Pls)
    } else {
        None
    }
}

pub fn parse(format: PlaylistFormat, body: &str) -> Vec<String> {
    match format {
        PlaylistFormat::M3u => parse_m3u(body),
        PlaylistFormat::Pls => parse_pls(body),
    }
}

/// Extracts entries from an M3U body.
///
/// Comment lines are skipped, except `#EXTINF` whose following line is the
/// entry whatever it looks like. Other lines count only if they start with
/// `http` or `/`.
pub fn parse_m3u(body: &str) -> Vec<String> {
    let mut urls = Vec::new();
    let mut lines = body.trim_start_matches(BOM).lines();

    while let Some(line) = lines.next() {
        if line.starts_with("#EXTINF") {
            if let Some(next) = lines.next() {
                urls.push(next.trim().to_string());
            }
        } else if line.starts_with('#') {
            continue;
        } else if line.starts_with("http") || line.starts_with('/') {
            urls.push(line.trim().to_string());
        }
    }
    urls
}

/// Extracts the values of `FileN=` keys from a PLS body.
pub fn parse_pls(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let (key, value) = line.trim_start_matches(BOM).split_once('=')?;
            let key = key.trim();
            let index = key.get(4..)?;
            let is_file_key = key.get(..4)?.eq_ignore_ascii_case("file")
                && !index.is_empty()
                && index.bytes().all(|b| b.is_ascii_digit());
            is_file_key.then(|| value.trim().to_string())
        })
        .collect()
}

/// Resolves raw entries against the playlist address, dropping empty
/// entries and ones that do not form a URL.
pub fn resolve_entries(base: &Url, entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| base.join(entry).ok())
        .map(String::from)
        .collect()
}
