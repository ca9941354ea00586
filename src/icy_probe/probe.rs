use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::debug;

use crate::config::{IcySettings, MAX_TIMEOUT_SECONDS};
use crate::context::ProbeContext;
use crate::error::ProbeError;
use crate::http_probe::result::ProbeResult;
use crate::target::{host_header, socket_address};

const MAX_LINE_BYTES: u64 = 8 * 1024;
const IO_TIMEOUT: &str = "i/o timeout";

/// Checks whether `url` is served by an ICY (Shoutcast/Icecast v1) server.
///
/// Sends a bare HTTP/1.0 request for `/` and only looks at the first
/// response line. On success the `Content-Type` header, when the server
/// sends one before the end of the header block, is returned in the result.
/// Socket failures are recorded in the run summary; a non-ICY answer is not.
pub async fn probe_icy(ctx: &ProbeContext, url: &str, station_name: &str) -> ProbeResult {
    let outcome = ctx
        .cancellable(exchange(&ctx.settings.icy, url))
        .await
        .and_then(|outcome| outcome);

    match outcome {
        Ok(content_type) => {
            debug!(url, station = station_name, "ICY stream detected (valid)");
            ctx.summary.add_icy_stream();
            ProbeResult::ok(station_name, url, content_type)
        }
        Err(err) => {
            match &err {
                ProbeError::Connection { reason } | ProbeError::Io { reason, .. } => {
                    ctx.summary.record_error(reason);
                }
                _ => {}
            }
            debug!(url, station = station_name, error = %err, "ICY check failed");
            ProbeResult::failed(station_name, url, err)
        }
    }
}

async fn exchange(settings: &IcySettings, url: &str) -> Result<Option<String>, ProbeError> {
    let address = socket_address(url)
        .ok_or_else(|| ProbeError::connection(format!("no host in {url}")))?;
    let host = host_header(url).unwrap_or_default();

    let stream = match timeout(settings.connect_timeout(), TcpStream::connect(&address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(ProbeError::connection(format!("connect to {address}: {e}"))),
        Err(_) => {
            return Err(ProbeError::connection(format!(
                "connect to {address}: {IO_TIMEOUT}"
            )));
        }
    };

    let now = Instant::now();
    let deadline = now
        .checked_add(settings.deadline())
        .unwrap_or(now + Duration::from_secs(MAX_TIMEOUT_SECONDS));
    let mut reader = BufReader::new(stream);

    let request =
        format!("GET / HTTP/1.0\r\nHost: {host}\r\nIcy-MetaData: 1\r\nConnection: close\r\n\r\n");
    match timeout_at(deadline, reader.get_mut().write_all(request.as_bytes())).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(io_failure("sending request", e.to_string())),
        Err(_) => return Err(io_failure("sending request", IO_TIMEOUT)),
    }

    let status_line = match timeout_at(deadline, read_line(&mut reader)).await {
        Ok(Ok(line)) => line,
        Ok(Err(e)) => return Err(io_failure("reading response", e.to_string())),
        Err(_) => return Err(io_failure("reading response", IO_TIMEOUT)),
    };

    if !status_line.starts_with("ICY") {
        return Err(ProbeError::NotIcyStream);
    }

    // Headers are best effort: the stream is already known to be alive.
    let mut content_type = None;
    while let Ok(Ok(line)) = timeout_at(deadline, read_line(&mut reader)).await {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-type") {
                content_type = Some(value.trim().to_string());
                break;
            }
        }
    }

    Ok(content_type)
}

// Reads one `\n` terminated line; EOF before the terminator is an error.
async fn read_line<R>(reader: &mut R) -> io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut *reader)
        .take(MAX_LINE_BYTES)
        .read_until(b'\n', &mut buf)
        .await?;

    if buf.last() != Some(&b'\n') {
        if buf.len() as u64 >= MAX_LINE_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "response line too long"));
        }
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected EOF"));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn io_failure(action: &'static str, reason: impl Into<String>) -> ProbeError {
    ProbeError::Io {
        action,
        reason: reason.into(),
    }
}
