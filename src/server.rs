use std::{
    future::Future,
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    path::Path,
    time::Duration,
};

use axum::Router;
use axum_server::{Handle, tls_rustls::RustlsConfig};
use chrono::{Datelike, Days, Utc};
use rcgen::{
    CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose, SanType,
};
use tokio::task::JoinHandle;
use url::{Host, Url};

use crate::{api::Completion, error::AuthError, warning};

/// Host, port and path the callback listener must serve, taken from the
/// configured redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    addr: SocketAddr,
    path: String,
    secure: bool,
}

impl RedirectTarget {
    /// Parses a redirect URL. Only `http`/`https` URLs pointing at a
    /// loopback address (or `localhost`) with an explicit or default port
    /// are accepted.
    pub fn parse(redirect_url: &str) -> Result<Self, AuthError> {
        let invalid = |reason: &str| AuthError::InvalidRedirect {
            url: redirect_url.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(redirect_url).map_err(|e| invalid(&e.to_string()))?;
        let secure = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
        };

        let ip = match url.host() {
            Some(Host::Ipv4(ip)) if ip.is_loopback() => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) if ip.is_loopback() => IpAddr::V6(ip),
            Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
                IpAddr::V4(Ipv4Addr::LOCALHOST)
            }
            Some(host) => return Err(AuthError::NonLoopbackRedirect(host.to_string())),
            None => return Err(invalid("missing host")),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("missing port"))?;

        Ok(Self {
            addr: SocketAddr::new(ip, port),
            path: url.path().to_string(),
            secure,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

/// PEM-encoded certificate chain and private key for the HTTPS listener.
#[derive(Clone)]
pub struct TlsMaterial {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("cert_pem", &format_args!("{} bytes", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

impl TlsMaterial {
    pub async fn from_files(cert: &Path, key: &Path) -> Result<Self, AuthError> {
        let cert_pem = async_fs::read_to_string(cert)
            .await
            .map_err(|e| AuthError::Tls(format!("{}: {}", cert.display(), e)))?;
        let key_pem = async_fs::read_to_string(key)
            .await
            .map_err(|e| AuthError::Tls(format!("{}: {}", key.display(), e)))?;
        Ok(Self { cert_pem, key_pem })
    }

    /// Generates a throwaway certificate for `localhost`, `127.0.0.1` and
    /// `::1`, valid for one year from today.
    pub fn self_signed() -> Result<Self, AuthError> {
        let tls_err = |e: rcgen::Error| AuthError::Tls(e.to_string());

        let mut params = CertificateParams::new(vec!["localhost".to_string()]).map_err(tls_err)?;
        params
            .subject_alt_names
            .push(SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        params
            .subject_alt_names
            .push(SanType::IpAddress(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        params
            .distinguished_name
            .push(DnType::CommonName, "setlist callback");
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];

        let today = Utc::now().date_naive();
        let expires = today.checked_add_days(Days::new(365)).unwrap_or(today);
        params.not_before = rcgen::date_time_ymd(today.year(), today.month() as u8, today.day() as u8);
        params.not_after =
            rcgen::date_time_ymd(expires.year(), expires.month() as u8, expires.day() as u8);

        let key_pair = KeyPair::generate().map_err(tls_err)?;
        let cert = params.self_signed(&key_pair).map_err(tls_err)?;

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    async fn rustls_config(&self) -> Result<RustlsConfig, AuthError> {
        // reqwest brings its own provider along, so pick one explicitly.
        // An Err only means a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        RustlsConfig::from_pem(
            self.cert_pem.clone().into_bytes(),
            self.key_pem.clone().into_bytes(),
        )
        .await
        .map_err(|e| AuthError::Tls(e.to_string()))
    }
}

/// Ephemeral listener serving the OAuth callback route.
///
/// Started per authorization attempt and always stopped through
/// [`CallbackServer::shutdown`].
pub struct CallbackServer {
    handle: Handle,
    task: JoinHandle<()>,
}

impl CallbackServer {
    /// Binds the exact address of `target` and starts serving `app`.
    /// Returns once the socket accepts connections.
    ///
    /// A listener error after startup is reported through `completion`.
    pub async fn start(
        target: &RedirectTarget,
        app: Router,
        tls: Option<TlsMaterial>,
        completion: Completion,
    ) -> Result<Self, AuthError> {
        let addr = target.addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .and_then(|l| l.into_std())
            .and_then(|l| l.set_nonblocking(true).map(|_| l))
            .map_err(|source| AuthError::Bind { addr, source })?;

        let handle = Handle::new();
        let service = app.into_make_service();

        let task = match tls {
            Some(material) => {
                let config = material.rustls_config().await?;
                let server = axum_server::tls_rustls::from_tcp_rustls(listener, config)
                    .handle(handle.clone());
                tokio::spawn(report_listener_error(server.serve(service), completion))
            }
            None => {
                let server = axum_server::from_tcp(listener).handle(handle.clone());
                tokio::spawn(report_listener_error(server.serve(service), completion))
            }
        };

        if handle.listening().await.is_none() {
            task.abort();
            return Err(AuthError::Listener(format!(
                "listener on {} did not start",
                addr
            )));
        }

        Ok(Self { handle, task })
    }

    /// Stops accepting connections and waits up to `grace` for in-flight
    /// requests before dropping them.
    pub async fn shutdown(mut self, grace: Duration) {
        self.handle.graceful_shutdown(Some(grace));
        let deadline = grace + Duration::from_millis(250);
        if tokio::time::timeout(deadline, &mut self.task).await.is_err() {
            warning!("Callback listener did not stop in time, aborting it");
            self.task.abort();
        }
    }
}

async fn report_listener_error<F>(serve: F, completion: Completion)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = serve.await {
        warning!("Callback listener stopped: {}", e);
        completion.fail(AuthError::Listener(e.to_string())).await;
    }
}
