//! FTP error types

use thiserror::Error;

use crate::response::Response;

/// FTP protocol and connection errors
#[derive(Error, Debug)]
pub enum FtpError {
    /// IO error during network operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS error during secure connection
    #[error("TLS error: {0}")]
    Tls(String),

    /// Read or write deadline expired
    #[error("Operation timed out")]
    Timeout,

    /// Malformed reply, address, or listing field from the server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Server answered a command with an unexpected reply code
    #[error("{command}: server replied {code} {message}")]
    Protocol {
        /// The command that was sent (verb and arguments)
        command: String,
        /// FTP reply code (e.g. 530, 550)
        code: u16,
        /// Reply text from the server
        message: String,
    },

    /// Transfer forced closed by `quit`
    #[error("Transfer aborted")]
    Aborted,

    /// Command channel closed (EOF or after `quit`)
    #[error("Connection closed")]
    ConnectionClosed,

    /// Unsupported or malformed FTP URL
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl FtpError {
    /// Build a protocol error from a command and the offending reply
    pub(crate) fn protocol(command: impl Into<String>, reply: &Response) -> Self {
        FtpError::Protocol {
            command: command.into(),
            code: reply.code,
            message: reply.message.clone(),
        }
    }

    /// True for 4xx replies: the condition is temporary and the same
    /// command may succeed if retried by the caller
    pub fn is_transient(&self) -> bool {
        matches!(self, FtpError::Protocol { code, .. } if (400..500).contains(code))
    }

    /// True for 5xx replies: retrying the same command will not help
    pub fn is_permanent(&self) -> bool {
        matches!(self, FtpError::Protocol { code, .. } if (500..600).contains(code))
    }

    /// Reply code carried by a protocol error, if any
    pub fn code(&self) -> Option<u16> {
        match self {
            FtpError::Protocol { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using FtpError
pub type Result<T> = std::result::Result<T, FtpError>;
