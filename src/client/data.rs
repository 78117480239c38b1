//! Data-channel negotiation and lifecycle
//!
//! Every data-bearing command runs the same five steps: negotiate an
//! endpoint (passive dial or active listen), send the command, expect a
//! preliminary reply, stream the payload, then consume the deferred
//! completion reply on the command channel. Failures interleave across
//! both sockets; this module keeps the ordering straight.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::debug;

use super::io::{ControlConn, NetStream, command_text};
use crate::addr;
use crate::config::tune_socket;
use crate::error::{FtpError, Result};
use crate::response::{Response, codes};

/// A negotiated data endpoint, not yet tied to a command
pub(crate) enum DataSetup {
    /// Passive mode: we dialed the server's advertised endpoint
    Dialed(TcpStream),
    /// Active mode: the server will dial our listener once it has
    /// processed the data-bearing command
    Listening(TcpListener),
}

/// An open data connection carrying one operation's payload
pub(crate) struct DataConn {
    pub(crate) stream: NetStream,
}

impl DataConn {
    /// Shut the payload stream down (sends TLS close_notify when wrapped)
    pub(crate) async fn close(&mut self) -> std::io::Result<()> {
        self.stream.shutdown().await
    }
}

/// Negotiate a data endpoint per the session's mode settings
pub(crate) async fn prepare(conn: &mut ControlConn) -> Result<DataSetup> {
    if conn.options.active_mode {
        return prepare_active(conn).await;
    }
    let addr = passive_addr(conn).await?;
    let dialer = conn.options.dialer.clone();
    let stream = timeout(conn.options.timeout, dialer.connect(addr))
        .await
        .map_err(|_| FtpError::Timeout)??;
    Ok(DataSetup::Dialed(stream))
}

/// Resolve the server's passive endpoint, preferring EPSV
///
/// A 502 to EPSV disables it for the rest of the session; any other
/// negative reply falls back to PASV for this operation only, so a
/// later attempt may try EPSV again.
async fn passive_addr(conn: &mut ControlConn) -> Result<SocketAddr> {
    let control_host = conn.peer_addr.ip();

    if !conn.options.disable_epsv && !conn.epsv_disabled {
        let reply = conn.exec("EPSV", &[]).await?;
        if reply.is_positive() {
            let port = addr::parse_epsv(&reply.message)?;
            return Ok(SocketAddr::new(control_host, port));
        }
        if reply.code == codes::NOT_IMPLEMENTED {
            debug!("EPSV not implemented by server, using PASV from now on");
            conn.epsv_disabled = true;
        }
    }

    let reply = conn.exec("PASV", &[]).await?;
    if !reply.is_positive() {
        return Err(FtpError::protocol("PASV", &reply));
    }
    let (ip, port) = addr::parse_pasv(&reply.message)?;
    let ip = if ip.is_unspecified() {
        // Firewalled servers advertise 0.0.0.0; dial the control peer
        control_host
    } else {
        IpAddr::V4(ip)
    };
    Ok(SocketAddr::new(ip, port))
}

/// Bind an active-mode listener and advertise it via PORT or EPRT
///
/// The listener binds to the control connection's local interface,
/// falling back to the unspecified address when that bind fails.
async fn prepare_active(conn: &mut ControlConn) -> Result<DataSetup> {
    let local_ip = conn.local_addr.ip();
    let listener = match TcpListener::bind((local_ip, 0)).await {
        Ok(listener) => listener,
        Err(e) => {
            debug!("Bind to {} failed ({}), listening on any interface", local_ip, e);
            let any: IpAddr = match local_ip {
                IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
                IpAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
            };
            TcpListener::bind((any, 0)).await?
        }
    };

    let mut advertised = listener.local_addr()?;
    if advertised.ip().is_unspecified() {
        advertised.set_ip(local_ip);
    }

    if advertised.is_ipv4() {
        let args = addr::format_port_args(&advertised)?;
        conn.exec_positive("PORT", &[&args]).await?;
    } else {
        let args = addr::format_eprt_args(&advertised);
        conn.exec_positive("EPRT", &[&args]).await?;
    }

    Ok(DataSetup::Listening(listener))
}

/// Send the data-bearing command and connect the payload stream
///
/// The command must draw a 1xx preliminary or a direct 2xx; 4xx/5xx
/// tears the endpoint down and surfaces a protocol error. In active
/// mode the accept happens here, after the server has seen the command,
/// under the configured I/O deadline.
pub(crate) async fn open(
    conn: &mut ControlConn,
    setup: DataSetup,
    verb: &str,
    args: &[&str],
) -> Result<DataConn> {
    let reply = conn.exec(verb, args).await?;
    if !reply.is_preliminary() && !reply.is_positive() {
        // Dropping the setup closes the dialed socket or listener
        return Err(FtpError::protocol(command_text(verb, args), &reply));
    }

    let tcp = match setup {
        DataSetup::Dialed(stream) => stream,
        DataSetup::Listening(listener) => {
            let (stream, peer) = timeout(conn.options.timeout, listener.accept())
                .await
                .map_err(|_| FtpError::Timeout)??;
            debug!("Accepted active-mode data connection from {}", peer);
            tune_socket(&stream);
            stream
        }
    };

    let stream = match &conn.data_tls {
        Some(tls) => {
            let domain = tls.domain.clone();
            let handshake = tls.connector.connect(domain, tcp);
            let tls_stream = timeout(conn.options.timeout, handshake)
                .await
                .map_err(|_| FtpError::Timeout)?
                .map_err(|e| FtpError::Tls(format!("data-channel TLS handshake failed: {}", e)))?;
            NetStream::Tls(Box::new(tls_stream))
        }
        None => NetStream::Plain(tcp),
    };

    Ok(DataConn { stream })
}

/// Consume the deferred completion reply after the data connection
/// closed; a non-2xx fails the operation even though the payload
/// appeared to move
pub(crate) async fn finish(conn: &mut ControlConn, command: &str) -> Result<Response> {
    let reply = conn.read_reply().await?;
    if !reply.is_positive() {
        return Err(FtpError::protocol(command, &reply));
    }
    Ok(reply)
}
