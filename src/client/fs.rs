//! Directory and file management commands
//!
//! These are single command/reply exchanges on the command channel;
//! only MLSD (in the listing module) needs a data connection. Every
//! operation takes the session operation lock so it cannot interleave
//! with an in-flight transfer.

use chrono::{DateTime, Utc};

use super::FtpClient;
use crate::entry::Entry;
use crate::error::{FtpError, Result};
use crate::listing::{parse_mlsx_line, parse_mlsx_timestamp};
use crate::response::{Response, codes};

impl FtpClient {
    /// Change the working directory
    pub async fn cwd(&self, path: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_positive("CWD", &[path]).await?;
        Ok(())
    }

    /// Change to the parent directory
    pub async fn cdup(&self) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_positive("CDUP", &[]).await?;
        Ok(())
    }

    /// The current working directory, from the quoted path in the PWD
    /// reply
    pub async fn pwd(&self) -> Result<String> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let reply = conn.exec_expect(codes::PATH_CREATED, "PWD", &[]).await?;
        parse_quoted_path(&reply.message).ok_or_else(|| {
            FtpError::InvalidResponse(format!("PWD reply without quoted path: {}", reply.message))
        })
    }

    /// Create a directory
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::PATH_CREATED, "MKD", &[path]).await?;
        Ok(())
    }

    /// Remove a directory
    pub async fn rmdir(&self, path: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::FILE_ACTION_OK, "RMD", &[path]).await?;
        Ok(())
    }

    /// Delete a file
    pub async fn delete(&self, path: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::FILE_ACTION_OK, "DELE", &[path]).await?;
        Ok(())
    }

    /// Rename `from` to `to` (RNFR expecting 350, then RNTO)
    ///
    /// Both commands run under one lock acquisition so nothing can slip
    /// between the pair.
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::FILE_ACTION_PENDING, "RNFR", &[from])
            .await?;
        conn.exec_positive("RNTO", &[to]).await?;
        Ok(())
    }

    /// File size in bytes via SIZE (RFC 3659 §4)
    pub async fn size(&self, path: &str) -> Result<u64> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let reply = conn.exec_expect(codes::FILE_STATUS, "SIZE", &[path]).await?;
        reply.message.trim().parse().map_err(|_| {
            FtpError::InvalidResponse(format!("unparseable SIZE reply: {}", reply.message))
        })
    }

    /// Modification time via MDTM (RFC 3659 §3): `YYYYMMDDHHMMSS` UTC
    pub async fn mdtm(&self, path: &str) -> Result<DateTime<Utc>> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let reply = conn.exec_expect(codes::FILE_STATUS, "MDTM", &[path]).await?;
        parse_mlsx_timestamp(reply.message.trim()).ok_or_else(|| {
            FtpError::InvalidResponse(format!("unparseable MDTM reply: {}", reply.message))
        })
    }

    /// Set the modification time via MFMT (draft-somers-ftp-mfxx)
    pub async fn set_mtime(&self, path: &str, when: DateTime<Utc>) -> Result<()> {
        let stamp = when.format("%Y%m%d%H%M%S").to_string();
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_expect(codes::FILE_STATUS, "MFMT", &[&stamp, path])
            .await?;
        Ok(())
    }

    /// Change permissions via `SITE CHMOD` with a 4-digit octal mode
    pub async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let mode = format!("{:04o}", mode & 0o7777);
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_positive("SITE", &["CHMOD", &mode, path]).await?;
        Ok(())
    }

    /// Typed facts for a single path via MLST (RFC 3659 §7)
    ///
    /// Pass "" for the current directory. The entry comes from the
    /// space-prefixed fact line of the 250 reply; no data connection is
    /// involved.
    pub async fn mlst(&self, path: &str) -> Result<Entry> {
        let args: Vec<&str> = if path.is_empty() { vec![] } else { vec![path] };
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let reply = conn.exec_expect(codes::FILE_ACTION_OK, "MLST", &args).await?;
        drop(conn);

        for line in &reply.lines {
            if let Some(facts) = line.strip_prefix(' ') {
                if let Some(entry) = parse_mlsx_line(facts) {
                    return Ok(entry);
                }
            }
        }
        Err(FtpError::InvalidResponse(format!(
            "MLST reply without an entry line: {}",
            reply.message
        )))
    }

    /// Server system type via SYST
    pub async fn system(&self) -> Result<String> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        let reply = conn.exec_expect(codes::NAME_SYSTEM_TYPE, "SYST", &[]).await?;
        Ok(reply.message)
    }

    /// No-op round trip, useful as a liveness probe
    pub async fn noop(&self) -> Result<()> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec_positive("NOOP", &[]).await?;
        Ok(())
    }

    /// Escape hatch: send an arbitrary command and return the raw reply
    ///
    /// No reply-code checking is applied; inspect the [`Response`]
    /// yourself.
    pub async fn quote(&self, verb: &str, args: &[&str]) -> Result<Response> {
        let _op = self.op.lock().await;
        let mut conn = self.conn.lock().await;
        conn.exec(verb, args).await
    }
}

/// The text between the first pair of double quotes, as used by PWD and
/// MKD replies (`257 "/home/user" is current directory`)
fn parse_quoted_path(message: &str) -> Option<String> {
    let start = message.find('"')?;
    let rest = &message[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_path() {
        assert_eq!(
            parse_quoted_path("\"/home/user\" is the current directory"),
            Some("/home/user".to_string())
        );
        assert_eq!(parse_quoted_path("\"/\""), Some("/".to_string()));
        // First pair wins
        assert_eq!(
            parse_quoted_path("\"/a\" and \"/b\""),
            Some("/a".to_string())
        );
        assert_eq!(parse_quoted_path("no quotes"), None);
        assert_eq!(parse_quoted_path("\"unterminated"), None);
    }
}
