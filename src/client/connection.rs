//! Session establishment and teardown
//!
//! This module handles dialing (plain, implicit and explicit TLS),
//! the server greeting, login with FEAT discovery, the keep-alive
//! task, and `quit`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::lookup_host;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::client::{ClientSessionMemoryCache, Resumption};
use tokio_rustls::rustls::crypto::{CryptoProvider, ring};
use tokio_rustls::rustls::pki_types::ServerName;
use tracing::debug;
use url::Url;

use super::io::{ControlConn, DataTls, NetStream};
use super::{FtpClient, KeepAlive, Shared};
use crate::config::{ConnectOptions, TlsMode, TlsOptions};
use crate::error::{FtpError, Result};
use crate::features::Features;
use crate::response::codes;

/// TLS sessions kept for resumption, shared between the command
/// channel and every data connection
const SESSION_CACHE_SIZE: usize = 64;

impl FtpClient {
    /// Connect to an FTP server
    ///
    /// Dials `addr` (`host:port`; `:21` is assumed when no port is
    /// given), reads the greeting, performs the configured TLS setup,
    /// logs in when credentials were provided, and starts keep-alive.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - [`FtpError::Io`] - resolution or TCP connect fails
    /// - [`FtpError::Tls`] - a TLS handshake fails
    /// - [`FtpError::Timeout`] - the server does not respond in time
    /// - [`FtpError::Protocol`] - greeting, AUTH TLS, PBSZ/PROT or
    ///   login draw an unexpected reply
    pub async fn dial(addr: &str, options: ConnectOptions) -> Result<FtpClient> {
        let options = Arc::new(options);
        let socket_addr = resolve(addr).await?;
        debug!("Connecting to FTP server {}", socket_addr);

        let tcp = timeout(options.timeout, options.dialer.connect(socket_addr))
            .await
            .map_err(|_| FtpError::Timeout)??;
        let peer_addr = tcp.peer_addr()?;
        let local_addr = tcp.local_addr()?;

        let shared = Arc::new(Shared::new());
        let cache = Arc::new(ClientSessionMemoryCache::new(SESSION_CACHE_SIZE));

        let (stream, data_tls) = match &options.tls {
            TlsMode::Implicit(tls_options) => {
                let (connector, domain) = tls_connector(tls_options, &cache)?;
                let handshake = connector.connect(domain.clone(), tcp);
                let tls = timeout(options.timeout, handshake)
                    .await
                    .map_err(|_| FtpError::Timeout)?
                    .map_err(|e| FtpError::Tls(format!("TLS handshake failed: {}", e)))?;
                (
                    NetStream::Tls(Box::new(tls)),
                    Some(DataTls { connector, domain }),
                )
            }
            _ => (NetStream::Plain(tcp), None),
        };

        let mut conn = ControlConn::new(
            stream,
            options.clone(),
            shared.clone(),
            peer_addr,
            local_addr,
        );
        conn.data_tls = data_tls;

        let greeting = conn.read_reply().await?;
        debug!("Server greeting: {} {}", greeting.code, greeting.message);
        if !greeting.is_positive() {
            return Err(FtpError::protocol("<greeting>", &greeting));
        }

        if let TlsMode::Explicit(tls_options) = &options.tls {
            conn.exec_positive("AUTH", &["TLS"]).await?;
            let (connector, domain) = tls_connector(tls_options, &cache)?;
            conn.upgrade_tls(&connector, domain.clone()).await?;
            conn.data_tls = Some(DataTls { connector, domain });
        }

        // RFC 4217: declare the buffer size and ask for private data
        // channels right after the command channel is secured
        if conn.data_tls.is_some() {
            conn.exec_positive("PBSZ", &["0"]).await?;
            conn.exec_positive("PROT", &["P"]).await?;
        }

        let client = FtpClient::from_parts(conn, shared, options.clone(), greeting);
        if let Some((user, password)) = &options.credentials {
            client.login(user, password).await?;
        }
        client.start_keepalive();
        Ok(client)
    }

    /// Connect using an FTP URL
    ///
    /// Recognized schemes: `ftp://` (plain, port 21), `ftps://`
    /// (implicit TLS, port 990) and `ftp+explicit://` (AUTH TLS
    /// upgrade, port 21). URL user-info performs login; a non-root
    /// path issues CWD after connecting.
    pub async fn connect_url(raw: &str) -> Result<FtpClient> {
        Self::connect_url_with(raw, ConnectOptions::new()).await
    }

    /// Connect using an FTP URL, starting from the given options
    ///
    /// The URL scheme overrides the options' TLS mode and URL user-info
    /// overrides configured credentials.
    pub async fn connect_url_with(raw: &str, mut options: ConnectOptions) -> Result<FtpClient> {
        let url = Url::parse(raw).map_err(|e| FtpError::Url(format!("{}: {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| FtpError::Url(format!("missing host: {}", raw)))?
            .to_string();

        let (default_port, tls) = match url.scheme() {
            "ftp" => (21, TlsMode::None),
            "ftps" => (990, TlsMode::Implicit(TlsOptions::new(&host))),
            "ftp+explicit" => (21, TlsMode::Explicit(TlsOptions::new(&host))),
            other => return Err(FtpError::Url(format!("unsupported scheme {:?}", other))),
        };
        options.tls = tls;
        if !url.username().is_empty() {
            options.credentials = Some((
                url.username().to_string(),
                url.password().unwrap_or("").to_string(),
            ));
        }

        let port = url.port().unwrap_or(default_port);
        let client = Self::dial(&format!("{}:{}", host, port), options).await?;

        let path = url.path();
        if !path.is_empty() && path != "/" {
            client.cwd(path).await?;
        }
        Ok(client)
    }

    /// Log in with the given credentials
    ///
    /// Sends USER and, when the server answers 331, PASS. A direct 230
    /// to USER (anonymous accept) skips PASS. On the first successful
    /// login the feature map is populated via FEAT — a rejected FEAT
    /// leaves it empty and is not an error — and `OPTS UTF8 ON` is sent
    /// best effort when the server advertises UTF8.
    ///
    /// A refused login (530) leaves the session usable for a retry with
    /// different credentials.
    pub async fn login(&self, user: &str, password: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        debug!("Logging in as {}", user);

        let reply = conn.exec("USER", &[user]).await?;
        match reply.code {
            codes::LOGGED_IN => {}
            codes::NEED_PASSWORD => {
                let reply = conn.exec("PASS", &[password]).await?;
                if reply.code != codes::LOGGED_IN {
                    // the password stays out of the error context
                    return Err(FtpError::protocol("PASS", &reply));
                }
            }
            _ => return Err(FtpError::protocol(format!("USER {}", user), &reply)),
        }
        debug!("Login successful");

        if self.shared.features.get().is_none() {
            let features = match conn.exec("FEAT", &[]).await? {
                reply if reply.is_positive() => Features::parse(&reply.lines),
                reply => {
                    // Unknown feature set is not fatal; the session
                    // stays usable with an empty map
                    debug!("FEAT rejected with {}, leaving feature map empty", reply.code);
                    Features::new()
                }
            };
            let utf8 = features.has("UTF8");
            let _ = self.shared.features.set(features);
            if utf8 {
                let _ = conn.exec("OPTS", &["UTF8", "ON"]).await;
            }
        }
        Ok(())
    }

    /// End the session
    ///
    /// Stops the keep-alive task, sends QUIT best effort, shuts the
    /// command channel down and forces any in-flight data connection
    /// closed, so a blocked transfer call unblocks with an error
    /// instead of hanging. After `quit` returns no background task is
    /// running and further commands fail with
    /// [`FtpError::ConnectionClosed`].
    pub async fn quit(&self) -> Result<()> {
        let keepalive = self.keepalive.lock().ok().and_then(|mut guard| guard.take());
        if let Some(keepalive) = keepalive {
            // Dropping the sender closes the shutdown channel
            drop(keepalive.shutdown);
            let _ = keepalive.task.await;
        }

        let mut conn = self.conn.lock().await;
        if !conn.is_closed() {
            let _ = conn.exec("QUIT", &[]).await;
            conn.close().await;
        }
        drop(conn);

        // With the command channel gone, unblock any copy still running
        self.shared.abort_transfers();
        Ok(())
    }

    /// Spawn the keep-alive task when an idle timeout is configured
    fn start_keepalive(&self) {
        let Some(idle) = self.options.idle_timeout else {
            return;
        };
        let conn = Arc::clone(&self.conn);
        let shared = Arc::clone(&self.shared);
        let (shutdown, mut shutdown_rx) = watch::channel(());
        let period = (idle / 2).max(Duration::from_millis(100));

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; swallow the first tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if shared.transfer_in_progress() || shared.idle_for() < idle {
                            continue;
                        }
                        let mut conn = conn.lock().await;
                        if conn.is_closed() {
                            break;
                        }
                        // Errors are swallowed; the next real command
                        // surfaces a broken channel
                        if let Err(e) = conn.exec("NOOP", &[]).await {
                            debug!("Keep-alive NOOP failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        if let Ok(mut guard) = self.keepalive.lock() {
            *guard = Some(KeepAlive { shutdown, task });
        }
    }
}

/// Clone the user TLS config, inject the shared resumption cache, and
/// resolve the SNI name
fn tls_connector(
    tls: &TlsOptions,
    cache: &Arc<ClientSessionMemoryCache>,
) -> Result<(TlsConnector, ServerName<'static>)> {
    let _ = CryptoProvider::install_default(ring::default_provider());

    let mut config = (*tls.config).clone();
    config.resumption = Resumption::store(cache.clone());
    let connector = TlsConnector::from(Arc::new(config));

    let domain = ServerName::try_from(tls.domain.clone())
        .map_err(|e| FtpError::Tls(format!("invalid TLS server name {:?}: {}", tls.domain, e)))?;
    Ok((connector, domain))
}

/// Resolve `host`, `host:port`, or a bare IP to a socket address,
/// assuming port 21 when none is given
async fn resolve(addr: &str) -> Result<SocketAddr> {
    let target = match addr.parse::<SocketAddr>() {
        Ok(socket_addr) => return Ok(socket_addr),
        Err(_) => match addr.parse::<IpAddr>() {
            Ok(ip) => return Ok(SocketAddr::new(ip, 21)),
            Err(_) if !addr.contains(':') => format!("{}:21", addr),
            Err(_) => addr.to_string(),
        },
    };
    lookup_host(&target)
        .await?
        .next()
        .ok_or_else(|| {
            FtpError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("no address resolved for {}", target),
            ))
        })
}
