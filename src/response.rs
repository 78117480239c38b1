//! FTP reply types and reply codes

/// A complete server reply: numeric code, joined message text, and the
/// raw line list as received (multi-line replies keep every line)
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Response {
    /// 3-digit FTP reply code
    pub code: u16,
    /// Human-readable message; multi-line replies are newline-joined with
    /// the `NNN-`/`NNN ` prefixes stripped
    pub message: String,
    /// Raw reply lines with line terminators removed
    pub lines: Vec<String>,
}

impl Response {
    /// 1xx: positive preliminary, more replies follow for this command
    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    /// 2xx: positive completion
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 3xx: positive intermediate, another command is expected
    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// 4xx: transient negative, the command may be retried
    pub fn is_transient_negative(&self) -> bool {
        (400..500).contains(&self.code)
    }

    /// 5xx: permanent negative
    pub fn is_permanent_negative(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// FTP reply codes (RFC 959, RFC 2228, RFC 2428, RFC 3659)
#[allow(dead_code)]
pub mod codes {
    // 1xx - Positive preliminary
    /// Data connection already open; transfer starting
    pub const ALREADY_OPEN: u16 = 125;
    /// File status okay; about to open data connection
    pub const ABOUT_TO_SEND: u16 = 150;

    // 2xx - Positive completion
    /// Command okay
    pub const COMMAND_OK: u16 = 200;
    /// Command not implemented, superfluous at this site
    pub const COMMAND_NOT_IMPLEMENTED_SUPERFLUOUS: u16 = 202;
    /// System status or FEAT reply (RFC 2389)
    pub const SYSTEM_STATUS: u16 = 211;
    /// File status (SIZE, MDTM, MFMT)
    pub const FILE_STATUS: u16 = 213;
    /// System type (SYST)
    pub const NAME_SYSTEM_TYPE: u16 = 215;
    /// Service ready for new user
    pub const READY: u16 = 220;
    /// Service closing control connection
    pub const CLOSING: u16 = 221;
    /// Closing data connection; transfer complete
    pub const CLOSING_DATA_CONNECTION: u16 = 226;
    /// Entering passive mode (RFC 959 §4.1.2)
    pub const PASSIVE_MODE: u16 = 227;
    /// Entering extended passive mode (RFC 2428)
    pub const EXTENDED_PASSIVE_MODE: u16 = 229;
    /// User logged in
    pub const LOGGED_IN: u16 = 230;
    /// Security data exchange complete (RFC 2228, AUTH TLS)
    pub const AUTH_OK: u16 = 234;
    /// Requested file action okay, completed
    pub const FILE_ACTION_OK: u16 = 250;
    /// "PATHNAME" created (PWD, MKD)
    pub const PATH_CREATED: u16 = 257;

    // 3xx - Positive intermediate
    /// User name okay, need password
    pub const NEED_PASSWORD: u16 = 331;
    /// Need account for login
    pub const NEED_ACCOUNT: u16 = 332;
    /// Requested file action pending further information (REST, RNFR)
    pub const FILE_ACTION_PENDING: u16 = 350;

    // 4xx - Transient negative
    /// Service not available, closing control connection
    pub const NOT_AVAILABLE: u16 = 421;
    /// Can't open data connection
    pub const CANT_OPEN_DATA_CONNECTION: u16 = 425;
    /// Connection closed; transfer aborted
    pub const TRANSFER_ABORTED: u16 = 426;
    /// Requested file action not taken; file unavailable
    pub const FILE_UNAVAILABLE: u16 = 450;

    // 5xx - Permanent negative
    /// Syntax error, command unrecognized
    pub const BAD_COMMAND: u16 = 500;
    /// Syntax error in parameters or arguments
    pub const BAD_ARGUMENTS: u16 = 501;
    /// Command not implemented
    pub const NOT_IMPLEMENTED: u16 = 502;
    /// Bad sequence of commands (e.g. RNTO without RNFR)
    pub const BAD_SEQUENCE: u16 = 503;
    /// Not logged in
    pub const NOT_LOGGED_IN: u16 = 530;
    /// Requested action not taken; file unavailable
    pub const FILE_NOT_FOUND: u16 = 550;
}
