//! TLS profiles and the ladder that walks them for `https` targets.
//!
//! Radio hosts run anything from current TLS stacks to decade-old appliances,
//! so a failed handshake is retried with progressively more permissive
//! profiles. Profiles that only need TLS 1.2+ with verification use rustls;
//! the rest need OpenSSL-era protocol versions and go through native-tls.

use std::future::Future;
use std::sync::Arc;

use rustls::crypto::ring;
use rustls::{CipherSuite, ClientConfig, SupportedProtocolVersion};
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use super::probe::probe_http;
use super::result::ProbeResult;
use crate::config::InsecurePolicy;
use crate::context::ProbeContext;
use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
}

impl TlsVersion {
    fn native(self) -> Option<native_tls::Protocol> {
        match self {
            TlsVersion::Tls10 => Some(native_tls::Protocol::Tlsv10),
            TlsVersion::Tls11 => Some(native_tls::Protocol::Tlsv11),
            TlsVersion::Tls12 => Some(native_tls::Protocol::Tlsv12),
            // no upper bound
            TlsVersion::Tls13 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSelection {
    /// Whatever the backend enables by default.
    Default,
    /// ECDHE key exchange with AES-GCM only (TLS 1.3 suites stay enabled).
    ModernAead,
}

/// One way of negotiating TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsProfile {
    pub name: &'static str,
    pub min_version: TlsVersion,
    pub max_version: TlsVersion,
    pub ciphers: CipherSelection,
    pub verify_certificates: bool,
}

pub const MODERN_TLS: TlsProfile = TlsProfile {
    name: "Modern TLS",
    min_version: TlsVersion::Tls12,
    max_version: TlsVersion::Tls13,
    ciphers: CipherSelection::ModernAead,
    verify_certificates: true,
};

pub const TLS12_ONLY: TlsProfile = TlsProfile {
    name: "TLS 1.2 Only",
    min_version: TlsVersion::Tls12,
    max_version: TlsVersion::Tls12,
    ciphers: CipherSelection::Default,
    verify_certificates: true,
};

pub const LEGACY_TLS: TlsProfile = TlsProfile {
    name: "Legacy TLS",
    min_version: TlsVersion::Tls10,
    max_version: TlsVersion::Tls12,
    ciphers: CipherSelection::Default,
    verify_certificates: true,
};

pub const INSECURE_LEGACY: TlsProfile = TlsProfile {
    name: "Insecure Legacy",
    min_version: TlsVersion::Tls10,
    max_version: TlsVersion::Tls12,
    ciphers: CipherSelection::Default,
    verify_certificates: false,
};

const MODERN_SUITES: &[CipherSuite] = &[
    CipherSuite::TLS13_AES_256_GCM_SHA384,
    CipherSuite::TLS13_AES_128_GCM_SHA256,
    CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
];

/// Profiles in the order they are tried.
pub fn ladder(insecure: InsecurePolicy) -> Vec<TlsProfile> {
    let secure = [MODERN_TLS, TLS12_ONLY, LEGACY_TLS];
    match insecure {
        InsecurePolicy::Disabled => secure.to_vec(),
        InsecurePolicy::LastResort => secure.into_iter().chain([INSECURE_LEGACY]).collect(),
        InsecurePolicy::First => [INSECURE_LEGACY].into_iter().chain(secure).collect(),
    }
}

/// Client-side TLS configuration in the shape reqwest accepts through
/// `use_preconfigured_tls`.
pub(crate) enum TlsBackend {
    Rustls(ClientConfig),
    Native(native_tls::TlsConnector),
}

impl TlsProfile {
    pub(crate) fn backend(&self) -> Result<TlsBackend, ProbeError> {
        if self.verify_certificates && self.min_version >= TlsVersion::Tls12 {
            self.rustls_config().map(TlsBackend::Rustls)
        } else {
            self.native_connector().map(TlsBackend::Native)
        }
    }

    fn rustls_config(&self) -> Result<ClientConfig, ProbeError> {
        let mut provider = ring::default_provider();
        if self.ciphers == CipherSelection::ModernAead {
            provider
                .cipher_suites
                .retain(|suite| MODERN_SUITES.contains(&suite.suite()));
        }

        let versions: Vec<&'static SupportedProtocolVersion> = [
            (TlsVersion::Tls13, &rustls::version::TLS13),
            (TlsVersion::Tls12, &rustls::version::TLS12),
        ]
        .into_iter()
        .filter(|(version, _)| (self.min_version..=self.max_version).contains(version))
        .map(|(_, supported)| supported)
        .collect();

        let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
            .with_protocol_versions(&versions)
            .map_err(|e| self.build_error(e))?
            .with_platform_verifier()
            .map_err(|e| self.build_error(e))?
            .with_no_client_auth();
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        Ok(config)
    }

    fn native_connector(&self) -> Result<native_tls::TlsConnector, ProbeError> {
        let mut builder = native_tls::TlsConnector::builder();
        builder
            .min_protocol_version(self.min_version.native())
            .max_protocol_version(self.max_version.native());
        if !self.verify_certificates {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(|e| self.build_error(e))
    }

    fn build_error(&self, err: impl std::fmt::Display) -> ProbeError {
        ProbeError::tls(format!("cannot set up {} profile: {err}", self.name))
    }
}

/// Probes an `https` URL with each TLS profile of the configured ladder.
pub async fn probe_tls_ladder(ctx: &ProbeContext, url: &str, station_name: &str) -> ProbeResult {
    let profiles = ladder(ctx.settings.tls.insecure);
    run_ladder(&profiles, url, station_name, |profile| {
        probe_http(ctx, url, station_name, Some(profile))
    })
    .await
}

/// Walks `profiles` until one attempt succeeds or fails for a non-TLS reason.
/// When every profile fails on TLS the last failure is returned.
pub(crate) async fn run_ladder<'a, F, Fut>(
    profiles: &'a [TlsProfile],
    url: &str,
    station_name: &str,
    mut attempt: F,
) -> ProbeResult
where
    F: FnMut(&'a TlsProfile) -> Fut,
    Fut: Future<Output = ProbeResult>,
{
    let mut last_result = None;

    for profile in profiles {
        let result = attempt(profile).await;
        if result.valid {
            return result;
        }
        let tls_failure = result.error.as_ref().is_some_and(ProbeError::is_tls);
        if !tls_failure {
            return result;
        }
        debug!(url, profile = profile.name, "TLS profile failed, trying next");
        last_result = Some(result);
    }

    last_result.unwrap_or_else(|| {
        ProbeResult::failed(station_name, url, ProbeError::tls("Failed all TLS configurations"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeSettings;
    use rcgen::CertifiedKey;
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use std::cell::Cell;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    fn names(profiles: &[TlsProfile]) -> Vec<&'static str> {
        profiles.iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_default_ladder_is_secure_only() {
        assert_eq!(
            names(&ladder(InsecurePolicy::Disabled)),
            vec!["Modern TLS", "TLS 1.2 Only", "Legacy TLS"]
        );
        assert!(ladder(InsecurePolicy::Disabled).iter().all(|p| p.verify_certificates));
    }

    #[test]
    fn test_insecure_policies() {
        assert_eq!(
            names(&ladder(InsecurePolicy::LastResort)),
            vec!["Modern TLS", "TLS 1.2 Only", "Legacy TLS", "Insecure Legacy"]
        );
        assert_eq!(
            names(&ladder(InsecurePolicy::First))[0],
            "Insecure Legacy"
        );
    }

    #[tokio::test]
    async fn test_ladder_stops_on_first_success() {
        let calls = Cell::new(0);
        let profiles = ladder(InsecurePolicy::Disabled);
        let result = run_ladder(&profiles, "https://a/", "A", |profile| {
            calls.set(calls.get() + 1);
            let name = profile.name;
            async move {
                if name == "TLS 1.2 Only" {
                    ProbeResult::ok("A", "https://a/", None)
                } else {
                    ProbeResult::failed("A", "https://a/", ProbeError::tls("handshake failure"))
                }
            }
        })
        .await;

        assert!(result.valid);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_ladder_stops_on_non_tls_failure() {
        let calls = Cell::new(0);
        let profiles = ladder(InsecurePolicy::LastResort);
        let result = run_ladder(&profiles, "https://a/", "A", |_| {
            calls.set(calls.get() + 1);
            async { ProbeResult::failed("A", "https://a/", ProbeError::HttpStatus(404)) }
        })
        .await;

        assert_eq!(result.error, Some(ProbeError::HttpStatus(404)));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_ladder_returns_last_tls_failure() {
        let profiles = ladder(InsecurePolicy::Disabled);
        let result = run_ladder(&profiles, "https://a/", "A", |profile| {
            let reason = format!("{} rejected", profile.name);
            async move { ProbeResult::failed("A", "https://a/", ProbeError::tls(reason)) }
        })
        .await;

        assert_eq!(result.error, Some(ProbeError::tls("Legacy TLS rejected")));
    }

    #[test]
    fn test_every_profile_builds() {
        for profile in ladder(InsecurePolicy::LastResort) {
            assert!(profile.backend().is_ok(), "{} failed to build", profile.name);
        }
    }

    #[tokio::test]
    async fn test_plaintext_server_fails_every_profile_on_tls() {
        // answers every connection with plain HTTP, which no TLS stack accepts
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let _ = socket
                        .write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n")
                        .await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        let ctx = ProbeContext::new(ProbeSettings::default());
        let url = format!("https://{address}/stream.mp3");
        let result = probe_tls_ladder(&ctx, &url, "Broken TLS").await;

        assert!(!result.valid);
        assert!(
            result.error.as_ref().is_some_and(ProbeError::is_tls),
            "expected a TLS error, got {:?}",
            result.error
        );
        assert!(result.error_message().starts_with("TLS error"));
        assert_eq!(ctx.summary.snapshot().tls_errors, 3);
    }

    /// HTTPS server with a freshly generated self-signed certificate that
    /// answers every request with an empty audio response.
    async fn self_signed_server() -> String {
        let CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).expect("certificate");
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let config = rustls::ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("protocol versions")
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .expect("server config");
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    let Ok(mut stream) = acceptor.accept(socket).await else {
                        return;
                    };
                    let mut buf = vec![0u8; 4096];
                    let mut received = Vec::new();
                    while !received.ends_with(b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => received.extend_from_slice(&buf[..n]),
                        }
                    }
                    let _ = stream
                        .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: 0\r\n\r\n")
                        .await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("https://{address}/live.mp3")
    }

    #[tokio::test]
    async fn test_self_signed_server_fails_secure_ladder_on_certificate() {
        let url = self_signed_server().await;
        let ctx = ProbeContext::new(ProbeSettings::default());

        let result = probe_tls_ladder(&ctx, &url, "Self Signed").await;

        assert!(!result.valid);
        assert!(
            result.error.as_ref().is_some_and(ProbeError::is_tls),
            "expected a TLS error, got {:?}",
            result.error
        );
        assert!(
            result.error_message().to_lowercase().contains("certificate"),
            "expected a certificate error, got {}",
            result.error_message()
        );
        assert_eq!(ctx.summary.snapshot().tls_errors, 3);
    }

    #[tokio::test]
    async fn test_last_resort_profile_accepts_self_signed_server() {
        let url = self_signed_server().await;
        let mut settings = ProbeSettings::default();
        settings.tls.insecure = InsecurePolicy::LastResort;
        let ctx = ProbeContext::new(settings);

        let result = probe_tls_ladder(&ctx, &url, "Self Signed").await;

        assert!(result.valid, "unexpected failure: {:?}", result.error);
        assert_eq!(result.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(ctx.summary.snapshot().tls_errors, 3);
    }
}
