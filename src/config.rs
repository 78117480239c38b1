//! Connection-time configuration
//!
//! `ConnectOptions` is a builder consumed by [`FtpClient::dial`]; a
//! snapshot is kept for the lifetime of the session. TLS configs given
//! here are cloned before the session cache is injected, never mutated
//! in place.
//!
//! [`FtpClient::dial`]: crate::FtpClient::dial

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::warn;

use crate::listing::ListParser;

/// Default per-I/O deadline when none is configured
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Custom outbound connector for data and control connections
///
/// The default implementation is [`TcpDialer`]; supply your own to
/// route through a SOCKS proxy or bind a specific interface.
pub trait Dialer: Send + Sync {
    /// Open a TCP connection to `addr`
    fn connect<'a>(
        &'a self,
        addr: SocketAddr,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<TcpStream>> + Send + 'a>>;
}

/// Plain `TcpStream::connect` dialer with socket tuning applied
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    fn connect<'a>(
        &'a self,
        addr: SocketAddr,
    ) -> Pin<Box<dyn Future<Output = std::io::Result<TcpStream>> + Send + 'a>> {
        Box::pin(async move {
            let stream = TcpStream::connect(addr).await?;
            tune_socket(&stream);
            Ok(stream)
        })
    }
}

/// Receive buffer for data connections (1MB)
///
/// The OS default is too small for high-bandwidth transfers on
/// high-latency links; a larger buffer reduces ACK round-trips.
const RECV_BUFFER_SIZE: usize = 1024 * 1024;

/// Set TCP_NODELAY and enlarge the receive buffer, best effort
pub(crate) fn tune_socket(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY: {}", e);
    }
    let socket = socket2::SockRef::from(stream);
    if let Err(e) = socket.set_recv_buffer_size(RECV_BUFFER_SIZE) {
        warn!(
            "Failed to set receive buffer size to {} bytes: {}",
            RECV_BUFFER_SIZE, e
        );
    }
}

/// TLS settings for one session
///
/// The same settings secure the command channel and every data
/// connection; the session injects a shared resumption cache into a
/// clone of `config` so servers can verify data-channel session reuse.
#[derive(Clone)]
pub struct TlsOptions {
    /// rustls client configuration
    pub config: Arc<ClientConfig>,
    /// Server name for SNI and certificate validation
    pub domain: String,
}

impl TlsOptions {
    /// TLS with the Mozilla root store (webpki-roots)
    pub fn new(domain: impl Into<String>) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self {
            config: Arc::new(config),
            domain: domain.into(),
        }
    }

    /// TLS that accepts any certificate
    ///
    /// **Security Warning:** certificate validation is disabled, making
    /// the connection vulnerable to man-in-the-middle attacks. Only use
    /// this for testing or with servers you trust on a secure network.
    pub fn insecure(domain: impl Into<String>) -> Self {
        warn!("TLS certificate validation disabled - connection vulnerable to MITM attacks");
        let config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousAcceptAnyCertificate))
            .with_no_client_auth();
        Self {
            config: Arc::new(config),
            domain: domain.into(),
        }
    }

    /// Use a caller-built rustls configuration
    pub fn with_config(config: Arc<ClientConfig>, domain: impl Into<String>) -> Self {
        Self {
            config,
            domain: domain.into(),
        }
    }
}

/// When and how the session is secured
#[derive(Clone, Default)]
pub(crate) enum TlsMode {
    /// Plain TCP throughout
    #[default]
    None,
    /// AUTH TLS upgrade after the greeting (RFC 4217)
    Explicit(TlsOptions),
    /// TLS handshake immediately after connect (port 990 convention)
    Implicit(TlsOptions),
}

/// Connection-time options for [`FtpClient::dial`]
///
/// # Example
///
/// ```no_run
/// use ftp_rs::{ConnectOptions, FtpClient, TlsOptions};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ConnectOptions::new()
///     .timeout(Duration::from_secs(10))
///     .idle_timeout(Duration::from_secs(60))
///     .explicit_tls(TlsOptions::new("ftp.example.com"))
///     .credentials("user", "secret");
/// let client = FtpClient::dial("ftp.example.com:21", options).await?;
/// # Ok(())
/// # }
/// ```
///
/// [`FtpClient::dial`]: crate::FtpClient::dial
#[must_use]
#[derive(Clone)]
pub struct ConnectOptions {
    /// Per-I/O read/write deadline
    pub(crate) timeout: Duration,
    /// Keep-alive NOOP threshold; None disables the background task
    pub(crate) idle_timeout: Option<Duration>,
    /// TLS layering mode
    pub(crate) tls: TlsMode,
    /// Login credentials applied during dial
    pub(crate) credentials: Option<(String, String)>,
    /// Outbound connector
    pub(crate) dialer: Arc<dyn Dialer>,
    /// Use PORT/EPRT instead of PASV/EPSV
    pub(crate) active_mode: bool,
    /// Skip EPSV and go straight to PASV
    pub(crate) disable_epsv: bool,
    /// User listing parsers, tried before the built-ins
    pub(crate) list_parsers: Vec<Arc<dyn ListParser>>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            idle_timeout: None,
            tls: TlsMode::None,
            credentials: None,
            dialer: Arc::new(TcpDialer),
            active_mode: false,
            disable_epsv: false,
            list_parsers: Vec::new(),
        }
    }
}

impl ConnectOptions {
    /// Options with defaults: 30s I/O deadline, no TLS, no keep-alive,
    /// passive mode with EPSV preferred
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-I/O read/write deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable the keep-alive task: a NOOP is sent whenever the session
    /// has been idle for `idle` and no transfer is running
    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = (idle > Duration::ZERO).then_some(idle);
        self
    }

    /// Upgrade to TLS with AUTH TLS after connecting (RFC 4217)
    ///
    /// Mutually exclusive with [`implicit_tls`](Self::implicit_tls);
    /// the mode set last wins.
    pub fn explicit_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = TlsMode::Explicit(tls);
        self
    }

    /// Perform the TLS handshake immediately after connect (implicit
    /// FTPS, conventionally port 990)
    ///
    /// Mutually exclusive with [`explicit_tls`](Self::explicit_tls);
    /// the mode set last wins.
    pub fn implicit_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = TlsMode::Implicit(tls);
        self
    }

    /// Log in with the given credentials during dial
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((user.into(), password.into()));
        self
    }

    /// Use a custom outbound connector
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Open data connections in active mode (PORT/EPRT)
    pub fn active_mode(mut self) -> Self {
        self.active_mode = true;
        self
    }

    /// Never try EPSV; negotiate passive data connections with PASV only
    pub fn disable_epsv(mut self) -> Self {
        self.disable_epsv = true;
        self
    }

    /// Prepend a custom LIST line parser
    ///
    /// Parsers registered here are tried in registration order before
    /// the built-in EPLF/DOS/Unix strategies.
    pub fn list_parser(mut self, parser: Arc<dyn ListParser>) -> Self {
        self.list_parsers.push(parser);
        self
    }
}

/// Certificate verifier that accepts everything
///
/// **Security Warning:** disables all certificate validation; see
/// [`TlsOptions::insecure`].
#[derive(Debug)]
struct DangerousAcceptAnyCertificate;

impl ServerCertVerifier for DangerousAcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, tokio_rustls::rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, tokio_rustls::rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}
