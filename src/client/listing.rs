//! Listing operations over the data channel
//!
//! LIST, NLST and MLSD follow the same data-channel lifecycle as file
//! transfers; the payload is line-oriented listing text instead of file
//! bytes.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::timeout;

use super::FtpClient;
use super::data::{self, DataConn};
use super::io::command_text;
use crate::entry::Entry;
use crate::error::{FtpError, Result};
use crate::listing::{parse_line_with, parse_mlsx_line};

impl FtpClient {
    /// Directory listing via LIST, decoded by the registered parsers
    ///
    /// Pass "" for the current directory. Lines no parser claims come
    /// back as [`EntryKind::Unknown`](crate::EntryKind::Unknown)
    /// entries with the raw text preserved.
    pub async fn list(&self, path: &str) -> Result<Vec<Entry>> {
        let lines = self.data_lines("LIST", path).await?;
        Ok(lines
            .iter()
            .filter_map(|line| parse_line_with(line, &self.options.list_parsers))
            .collect())
    }

    /// Name-only listing via NLST
    pub async fn name_list(&self, path: &str) -> Result<Vec<String>> {
        let lines = self.data_lines("NLST", path).await?;
        Ok(lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect())
    }

    /// Structured listing via MLSD (RFC 3659 §7)
    ///
    /// Each line carries machine-readable facts; `cdir`/`pdir` entries
    /// are returned as directories and left to the caller to filter.
    pub async fn mlsd(&self, path: &str) -> Result<Vec<Entry>> {
        let lines = self.data_lines("MLSD", path).await?;
        Ok(lines
            .iter()
            .filter_map(|line| parse_mlsx_line(line))
            .collect())
    }

    /// Run one listing command through the data-channel lifecycle and
    /// collect the payload as lines
    async fn data_lines(&self, verb: &str, path: &str) -> Result<Vec<String>> {
        let args: Vec<&str> = if path.is_empty() { vec![] } else { vec![path] };
        let command = command_text(verb, &args);

        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let setup = data::prepare(&mut conn).await?;
        let mut data_conn = data::open(&mut conn, setup, verb, &args).await?;
        self.shared.begin_transfer();
        drop(conn);

        let collected = self.read_data_lines(&mut data_conn).await;
        let closed = data_conn.close().await;

        let mut conn = self.conn.lock().await;
        self.shared.end_transfer();
        let completion = data::finish(&mut conn, &command).await;
        drop(conn);

        let lines = collected?;
        closed?;
        completion?;
        Ok(lines)
    }

    async fn read_data_lines(&self, data_conn: &mut DataConn) -> Result<Vec<String>> {
        let deadline = self.options.timeout;
        let mut reader = BufReader::new(&mut data_conn.stream);
        let mut lines = Vec::new();
        loop {
            if self.shared.is_aborted() {
                return Err(FtpError::Aborted);
            }
            let mut bytes = Vec::with_capacity(128);
            let n = tokio::select! {
                result = timeout(deadline, reader.read_until(b'\n', &mut bytes)) => {
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
            // Listings are not guaranteed UTF-8; decode lossily
            let line = String::from_utf8_lossy(&bytes);
            lines.push(line.trim_end_matches(['\r', '\n']).to_string());
        }
        Ok(lines)
    }
}
