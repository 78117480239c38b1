//! Low-level command-channel I/O
//!
//! This module provides the primitives every FTP operation is built on:
//! - the plain/TLS stream abstraction shared with data connections
//! - the reply reader (single-line, multi-line, RFC 2389 continuation)
//! - the command dispatcher with read/write deadlines

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tracing::trace;

use super::Shared;
use crate::config::ConnectOptions;
use crate::error::{FtpError, Result};
use crate::response::Response;

/// A TCP stream, optionally wrapped in TLS
///
/// Both the command channel and every data connection are one of
/// these; FTP requires the two to agree on security.
pub(crate) enum NetStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for NetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_flush(cx),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            NetStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            NetStream::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// TLS material for wrapping data connections, derived from the
/// control-channel TLS setup so both share one resumption cache
#[derive(Clone)]
pub(crate) struct DataTls {
    pub(crate) connector: TlsConnector,
    pub(crate) domain: ServerName<'static>,
}

/// The command channel and its per-session protocol state
///
/// Lives behind the session mutex; only one command/reply exchange is
/// ever in flight.
pub(crate) struct ControlConn {
    /// Buffered command stream; None once the channel is closed
    stream: Option<BufReader<NetStream>>,
    pub(crate) options: Arc<ConnectOptions>,
    pub(crate) shared: Arc<Shared>,
    /// Control-connection peer, the data host for EPSV and 0.0.0.0 PASV replies
    pub(crate) peer_addr: SocketAddr,
    /// Local endpoint; active-mode listeners bind to this interface
    pub(crate) local_addr: SocketAddr,
    /// Set once the channel is secured; data connections are wrapped with it
    pub(crate) data_tls: Option<DataTls>,
    /// Sticky flag: the server answered EPSV with 502, skip it from now on
    pub(crate) epsv_disabled: bool,
}

impl ControlConn {
    pub(crate) fn new(
        stream: NetStream,
        options: Arc<ConnectOptions>,
        shared: Arc<Shared>,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
    ) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            options,
            shared,
            peer_addr,
            local_addr,
            data_tls: None,
            epsv_disabled: false,
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream_mut(&mut self) -> Result<&mut BufReader<NetStream>> {
        self.stream.as_mut().ok_or(FtpError::ConnectionClosed)
    }

    /// Shut the command channel down; subsequent commands fail with
    /// `ConnectionClosed`
    pub(crate) async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.get_mut().shutdown().await;
        }
    }

    /// Swap the plain command stream for a TLS-wrapped one (AUTH TLS)
    pub(crate) async fn upgrade_tls(
        &mut self,
        connector: &TlsConnector,
        domain: ServerName<'static>,
    ) -> Result<()> {
        let stream = self.stream.take().ok_or(FtpError::ConnectionClosed)?;
        let tcp = match stream.into_inner() {
            NetStream::Plain(tcp) => tcp,
            tls @ NetStream::Tls(_) => {
                self.stream = Some(BufReader::new(tls));
                return Err(FtpError::Tls("control channel is already secured".into()));
            }
        };
        // A handshake failure leaves the stream consumed and the
        // session invalidated, as RFC 4217 requires.
        let tls = timeout(self.options.timeout, connector.connect(domain, tcp))
            .await
            .map_err(|_| FtpError::Timeout)?
            .map_err(|e| FtpError::Tls(format!("TLS handshake failed: {}", e)))?;
        self.stream = Some(BufReader::new(NetStream::Tls(Box::new(tls))));
        Ok(())
    }

    /// Read one line, line terminator stripped; EOF is `ConnectionClosed`
    async fn read_line_raw(&mut self) -> Result<String> {
        let stream = self.stream_mut()?;
        let mut bytes = Vec::with_capacity(128);
        stream.read_until(b'\n', &mut bytes).await?;
        if bytes.is_empty() {
            return Err(FtpError::ConnectionClosed);
        }
        let line = String::from_utf8_lossy(&bytes);
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read one complete server reply, applying the read deadline
    ///
    /// Multi-line grammar: `NNN-` opens a reply that runs until a
    /// `NNN ` line with the same code; lines beginning with a space are
    /// RFC 2389 content continuations and accepted regardless of
    /// prefix. Anything else mid-reply is a parse error.
    pub(crate) async fn read_reply(&mut self) -> Result<Response> {
        match timeout(self.options.timeout, self.read_reply_inner()).await {
            Ok(result) => result,
            Err(_) => Err(FtpError::Timeout),
        }
    }

    async fn read_reply_inner(&mut self) -> Result<Response> {
        let first = self.read_line_raw().await?;
        trace!("<<< {}", first);
        let (code, separator, message) = split_reply_line(&first)?;

        let mut messages = vec![message.to_string()];
        let mut lines = vec![first.clone()];

        if separator == Some(b'-') {
            let prefix = &first[..3];
            loop {
                let line = match self.read_line_raw().await {
                    Err(FtpError::ConnectionClosed) => {
                        return Err(FtpError::InvalidResponse(
                            "connection closed mid-reply".to_string(),
                        ));
                    }
                    other => other?,
                };
                trace!("<<< {}", line);

                if line.starts_with(' ') {
                    // RFC 2389 continuation, preserved verbatim
                    messages.push(line.clone());
                    lines.push(line);
                    continue;
                }

                let bytes = line.as_bytes();
                if bytes.len() >= 4 && line.starts_with(prefix) {
                    match bytes[3] {
                        b' ' => {
                            messages.push(line[4..].to_string());
                            lines.push(line);
                            break;
                        }
                        b'-' => {
                            messages.push(line[4..].to_string());
                            lines.push(line);
                            continue;
                        }
                        _ => {}
                    }
                }
                return Err(FtpError::InvalidResponse(format!(
                    "unexpected line in {} reply: {:?}",
                    code, line
                )));
            }
        }

        Ok(Response {
            code,
            message: messages.join("\n"),
            lines,
        })
    }

    /// Send one command and read its reply
    ///
    /// This is the single entry point for the command channel: it
    /// stamps the keep-alive clock, applies the write deadline, emits
    /// `<verb>[ <args>]\r\n` and reads one reply under the read
    /// deadline. Callers hold the session mutex for the whole exchange.
    pub(crate) async fn exec(&mut self, verb: &str, args: &[&str]) -> Result<Response> {
        let mut line = String::from(verb);
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }

        self.shared.touch();
        if verb.eq_ignore_ascii_case("PASS") {
            trace!(">>> PASS ****");
        } else {
            trace!(">>> {}", line);
        }

        line.push_str("\r\n");
        let deadline = self.options.timeout;
        let stream = self.stream_mut()?;
        let write = async {
            stream.get_mut().write_all(line.as_bytes()).await?;
            stream.get_mut().flush().await
        };
        match timeout(deadline, write).await {
            Ok(result) => result?,
            Err(_) => return Err(FtpError::Timeout),
        }

        self.read_reply().await
    }

    /// Send a command and require an exact reply code
    pub(crate) async fn exec_expect(
        &mut self,
        code: u16,
        verb: &str,
        args: &[&str],
    ) -> Result<Response> {
        let reply = self.exec(verb, args).await?;
        if reply.code != code {
            return Err(FtpError::protocol(command_text(verb, args), &reply));
        }
        Ok(reply)
    }

    /// Send a command and require any 2xx reply
    pub(crate) async fn exec_positive(&mut self, verb: &str, args: &[&str]) -> Result<Response> {
        let reply = self.exec(verb, args).await?;
        if !reply.is_positive() {
            return Err(FtpError::protocol(command_text(verb, args), &reply));
        }
        Ok(reply)
    }
}

/// Render a command for error messages, without trailing CRLF
pub(crate) fn command_text(verb: &str, args: &[&str]) -> String {
    let mut text = String::from(verb);
    for arg in args {
        text.push(' ');
        text.push_str(arg);
    }
    text
}

/// Split `NNN<sep>rest`; `sep` is a space (single-line), a hyphen
/// (multi-line opener), or absent on a bare-code line
fn split_reply_line(line: &str) -> Result<(u16, Option<u8>, &str)> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpError::InvalidResponse(format!(
            "missing reply code: {:?}",
            truncated(line)
        )));
    }
    let code: u16 = line[..3]
        .parse()
        .map_err(|_| FtpError::InvalidResponse(truncated(line)))?;
    if !(100..600).contains(&code) {
        return Err(FtpError::InvalidResponse(format!(
            "reply code out of range: {:?}",
            truncated(line)
        )));
    }
    match bytes.get(3) {
        None => Ok((code, None, "")),
        Some(b' ') => Ok((code, Some(b' '), &line[4..])),
        Some(b'-') => Ok((code, Some(b'-'), &line[4..])),
        Some(_) => Err(FtpError::InvalidResponse(format!(
            "malformed reply line: {:?}",
            truncated(line)
        ))),
    }
}

fn truncated(line: &str) -> String {
    line.chars().take(100).collect()
}
