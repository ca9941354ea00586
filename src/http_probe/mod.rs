pub mod client;
pub mod probe;
pub mod result;
pub mod tls;

pub mod prelude {
    pub use super::probe::probe_http;
    pub use super::result::ProbeResult;
    pub use super::tls::{TlsProfile, probe_tls_ladder};
}

use std::error::Error;
use std::fmt::Write;
use std::io;

/// Flattens an error and its sources into a single line.
/// Sources whose text the outer message already contains are skipped.
pub(crate) fn report(mut err: &(dyn Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let text = src.to_string();
        if !s.contains(&text) {
            let _ = write!(s, ": {}", text);
        }
        err = src;
    }
    s
}

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |e: &&'a (dyn Error + 'static)| (*e).source())
}

const TLS_MARKERS: &[&str] = &[
    "tls",
    "ssl",
    "x509",
    "certificate",
    "handshake",
    "corrupt message",
];

/// Whether a transport error came out of TLS negotiation or certificate
/// validation, judged by the error types in the chain and by its text.
fn is_tls_failure(err: &(dyn Error + 'static), message: &str) -> bool {
    let typed = chain(err).any(|e| {
        is_tls_error_type(e)
            || e
                .downcast_ref::<io::Error>()
                .and_then(io::Error::get_ref)
                .is_some_and(|inner| inner.is::<rustls::Error>() || inner.is::<native_tls::Error>())
    });
    let lower = message.to_lowercase();
    typed || TLS_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn is_tls_error_type(err: &(dyn Error + 'static)) -> bool {
    err.is::<rustls::Error>() || err.is::<native_tls::Error>()
}
