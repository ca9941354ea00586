use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::{ACCEPT, CONNECTION, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, ClientBuilder};
use url::Url;

use super::report;
use super::tls::{TlsBackend, TlsProfile};
use crate::config::ProbeSettings;
use crate::error::ProbeError;

/// Raised from the redirect policy once the hop limit is exceeded.
#[derive(Debug, thiserror::Error)]
#[error("too many redirects")]
pub struct TooManyRedirects;

/// Follows redirects up to a limit and remembers where they led.
#[derive(Debug, Clone)]
pub struct RedirectTracker {
    state: Arc<Mutex<RedirectState>>,
}

#[derive(Debug)]
struct RedirectState {
    last_url: String,
    hops: usize,
}

impl RedirectTracker {
    pub fn new(url: &str) -> Self {
        Self {
            state: Arc::new(Mutex::new(RedirectState {
                last_url: url.to_string(),
                hops: 0,
            })),
        }
    }

    /// The initial URL, or the target of the last redirect that was followed.
    pub fn last_url(&self) -> String {
        self.state.lock().last_url.clone()
    }

    pub fn redirected(&self) -> bool {
        self.state.lock().hops > 0
    }

    fn record(&self, url: &Url) {
        let mut state = self.state.lock();
        state.last_url = url.to_string();
        state.hops += 1;
    }

    fn check(&self, attempt: Attempt, max_redirects: usize) -> reqwest::redirect::Action {
        // `previous` includes the initial request
        if attempt.previous().len() > max_redirects {
            return attempt.error(TooManyRedirects);
        }
        self.record(attempt.url());
        attempt.follow()
    }

    pub fn policy(&self, max_redirects: usize) -> Policy {
        let tracker = self.clone();
        Policy::custom(move |attempt| tracker.check(attempt, max_redirects))
    }
}

fn default_headers(icy_metadata: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    if icy_metadata {
        headers.insert(
            HeaderName::from_static("icy-metadata"),
            HeaderValue::from_static("1"),
        );
    }
    headers
}

fn with_tls(builder: ClientBuilder, profile: Option<&TlsProfile>) -> Result<ClientBuilder, ProbeError> {
    let Some(profile) = profile else {
        return Ok(builder);
    };
    Ok(match profile.backend()? {
        TlsBackend::Rustls(config) => builder.use_preconfigured_tls(config),
        TlsBackend::Native(connector) => builder.use_preconfigured_tls(connector),
    })
}

fn build(builder: ClientBuilder) -> Result<Client, ProbeError> {
    builder.build().map_err(|e| ProbeError::Other {
        bucket: "Client Setup".to_string(),
        message: report(&e),
    })
}

/// Client for one stream probe. Redirects are followed through `tracker`.
pub fn stream_client(
    settings: &ProbeSettings,
    profile: Option<&TlsProfile>,
    tracker: &RedirectTracker,
) -> Result<Client, ProbeError> {
    let http = &settings.http;
    let builder = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(default_headers(true))
        .timeout(http.request_timeout())
        .connect_timeout(http.connect_timeout())
        .pool_idle_timeout(Duration::from_secs(http.pool_idle_timeout_seconds))
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .tcp_keepalive(Duration::from_secs(http.tcp_keepalive_seconds))
        .redirect(tracker.policy(settings.max_redirects));

    build(with_tls(builder, profile)?)
}

/// Client for downloading playlists: shorter timeouts and a plain redirect limit.
pub fn playlist_client(settings: &ProbeSettings) -> Result<Client, ProbeError> {
    let playlist = &settings.playlist;
    let builder = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(default_headers(false))
        .timeout(playlist.request_timeout())
        .connect_timeout(playlist.connect_timeout())
        .redirect(Policy::limited(settings.max_redirects));

    build(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_starts_at_initial_url() {
        let tracker = RedirectTracker::new("http://radio.example/live");
        assert_eq!(tracker.last_url(), "http://radio.example/live");
        assert!(!tracker.redirected());
    }

    #[test]
    fn test_tracker_records_followed_hops() {
        let tracker = RedirectTracker::new("http://radio.example/live");
        tracker.record(&Url::parse("http://cdn.example/live.mp3").expect("url"));
        assert_eq!(tracker.last_url(), "http://cdn.example/live.mp3");
        assert!(tracker.redirected());
    }

    #[test]
    fn test_clients_build_without_tls_profile() {
        let settings = ProbeSettings::default();
        let tracker = RedirectTracker::new("http://radio.example/");
        assert!(stream_client(&settings, None, &tracker).is_ok());
        assert!(playlist_client(&settings).is_ok());
    }
}
