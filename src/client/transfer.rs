//! Transfer engine: uploads, downloads and REST-based resume
//!
//! Every operation forces binary mode first. The payload copy runs
//! with the session mutex released; the deferred completion reply is
//! consumed under a fresh acquisition once the data connection has
//! closed. Copy errors win over completion errors, but the completion
//! reply is always read so the command channel stays in sync.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use super::FtpClient;
use super::data::{self, DataConn};
use crate::error::{FtpError, Result};
use crate::response::codes;

const COPY_CHUNK: usize = 64 * 1024;

impl FtpClient {
    /// Upload `src` to `path` with STOR, replacing any existing file
    pub async fn store<R>(&self, path: &str, src: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.upload("STOR", path, src).await
    }

    /// Upload `src`, appending to `path` with APPE
    pub async fn append<R>(&self, path: &str, src: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.upload("APPE", path, src).await
    }

    /// Upload `src` at `offset`: APPE for positive offsets, STOR
    /// otherwise
    ///
    /// APPE places the bytes beyond the file's current size, which
    /// matches `offset` only when `offset` equals that size. For a true
    /// mid-file resume on servers advertising `REST STREAM`, call
    /// [`restart_at`](Self::restart_at) and then [`store`](Self::store).
    pub async fn store_at<R>(&self, path: &str, src: &mut R, offset: u64) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let verb = if offset > 0 { "APPE" } else { "STOR" };
        self.upload(verb, path, src).await
    }

    /// Download `path` into `dest`; returns the bytes copied
    pub async fn retrieve<W>(&self, path: &str, dest: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.download(path, dest, 0).await
    }

    /// Download `path` starting at byte `offset` (REST + RETR)
    pub async fn retrieve_from<W>(&self, path: &str, dest: &mut W, offset: u64) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.download(path, dest, offset).await
    }

    /// Set the restart marker for the next transfer (RFC 3659 §5)
    ///
    /// The server must answer 350; the marker is consumed by the very
    /// next STOR or RETR on this session.
    pub async fn restart_at(&self, offset: u64) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::FILE_ACTION_PENDING, "REST", &[&offset.to_string()])
            .await?;
        Ok(())
    }

    async fn upload<R>(&self, verb: &str, path: &str, src: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let command = format!("{} {}", verb, path);
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::COMMAND_OK, "TYPE", &["I"]).await?;
        let setup = data::prepare(&mut conn).await?;
        let mut data_conn = data::open(&mut conn, setup, verb, &[path]).await?;
        self.shared.begin_transfer();
        drop(conn);

        let copied = self.copy_to_data(src, &mut data_conn).await;
        let closed = data_conn.close().await;

        let mut conn = self.conn.lock().await;
        self.shared.end_transfer();
        let completion = data::finish(&mut conn, &command).await;
        drop(conn);

        let copied = copied?;
        closed?;
        completion?;
        Ok(copied)
    }

    async fn download<W>(&self, path: &str, dest: &mut W, offset: u64) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let command = format!("RETR {}", path);
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::COMMAND_OK, "TYPE", &["I"]).await?;
        let setup = data::prepare(&mut conn).await?;
        if offset > 0 {
            conn.exec_expect(codes::FILE_ACTION_PENDING, "REST", &[&offset.to_string()])
                .await?;
        }
        let mut data_conn = data::open(&mut conn, setup, "RETR", &[path]).await?;
        self.shared.begin_transfer();
        drop(conn);

        let copied = self.copy_from_data(&mut data_conn, dest).await;
        let closed = data_conn.close().await;

        let mut conn = self.conn.lock().await;
        self.shared.end_transfer();
        let completion = data::finish(&mut conn, &command).await;
        drop(conn);

        let copied = copied?;
        closed?;
        completion?;
        Ok(copied)
    }

    /// Pump `src` into the data connection; socket writes run under the
    /// configured deadline and bail out when `quit` aborts the session
    async fn copy_to_data<R>(&self, src: &mut R, data_conn: &mut DataConn) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let deadline = self.options.timeout;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut total = 0u64;
        loop {
            if self.shared.is_aborted() {
                return Err(FtpError::Aborted);
            }
            let n = src.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            tokio::select! {
                result = timeout(deadline, data_conn.stream.write_all(&buf[..n])) => {
                    match result {
                        Ok(result) => result?,
                        Err(_) => return Err(FtpError::Timeout),
                    }
                }
                _ = self.shared.aborted_wait() => return Err(FtpError::Aborted),
            }
            total += n as u64;
        }
        Ok(total)
    }

    /// Pump the data connection into `dest` until the server closes it
    async fn copy_from_data<W>(&self, data_conn: &mut DataConn, dest: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let deadline = self.options.timeout;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut total = 0u64;
        loop {
            if self.shared.is_aborted() {
                return Err(FtpError::Aborted);
            }
            let n = tokio::select! {
                result = timeout(deadline, data_conn.stream.read(&mut buf)) => {
                    match result {
                        Ok(result) => result?,
                        Err(_) => return Err(FtpError::Timeout),
                    }
                }
                _ = self.shared.aborted_wait() => return Err(FtpError::Aborted),
            };
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n]).await?;
            total += n as u64;
        }
        dest.flush().await?;
        Ok(total)
    }
}
