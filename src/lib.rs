#![doc = include_str!("../README.md")]

/// PASV/EPSV/PORT/EPRT address codecs
pub mod addr;
mod client;
mod config;
/// Directory entry model
pub mod entry;
mod error;
/// FEAT feature-map parsing (RFC 2389)
pub mod features;
/// LIST line and MLSx fact decoding
pub mod listing;
/// Reply types and reply codes
pub mod response;

pub use client::FtpClient;
pub use config::{ConnectOptions, Dialer, TcpDialer, TlsOptions};
pub use entry::{Entry, EntryKind};
pub use error::{FtpError, Result};
pub use features::Features;
pub use listing::{DosParser, EplfParser, ListParser, UnixParser};
pub use response::{Response, codes};
