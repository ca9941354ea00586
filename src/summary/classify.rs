/// Bucket used for `read tcp ...` errors; reporters fold these into one row.
pub const READ_TCP_BUCKET: &str = "read tcp";

/// Maps a raw error message onto a short, stable bucket name.
///
/// The first matching rule wins. Messages that match no rule are bucketed by
/// their first three words.
pub fn summarize_error(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let has = |needle: &str| lower.contains(needle);

    if has("connection refused") {
        return "Connection Refused".to_string();
    }
    if has("network is unreachable")
        || has("no route to host")
        || has("i/o timeout")
        || has("timed out")
    {
        return "Network Error".to_string();
    }
    if has("invalid header") {
        return "Invalid Header".to_string();
    }
    if has("no such host") || has("server misbehaving") || has("lookup") || has("dns error") {
        return "DNS Error".to_string();
    }
    if has("certificate") || has("x509") {
        return "Certificate Error".to_string();
    }
    if has("too many open files") {
        return "Too Many Open Files".to_string();
    }
    if has("unexpected eof") {
        return "Unexpected EOF".to_string();
    }
    if lower.starts_with(READ_TCP_BUCKET) {
        return READ_TCP_BUCKET.to_string();
    }

    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.len() >= 3 {
        words[..3].join(" ")
    } else {
        raw.to_string()
    }
}
