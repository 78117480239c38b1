//! Data-port address codecs (RFC 959 §4.1.2, RFC 2428)
//!
//! PASV and EPSV replies are parsed into socket addresses; PORT and EPRT
//! arguments are rendered for active-mode listeners. All parsers reject
//! out-of-range components rather than wrapping.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::{FtpError, Result};

fn invalid(context: &str, input: &str) -> FtpError {
    FtpError::InvalidResponse(format!("{}: {:?}", context, input))
}

/// Parse a PASV reply message of the form
/// `Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
///
/// Each component must be in `0..=255`; the port is `p1 * 256 + p2`.
pub fn parse_pasv(message: &str) -> Result<(Ipv4Addr, u16)> {
    let start = message
        .find('(')
        .ok_or_else(|| invalid("PASV reply without host-port", message))?;
    let end = message[start..]
        .find(')')
        .map(|i| start + i)
        .ok_or_else(|| invalid("PASV reply without host-port", message))?;

    let mut parts = [0u8; 6];
    let mut count = 0;
    for field in message[start + 1..end].split(',') {
        if count == 6 {
            return Err(invalid("PASV host-port has too many fields", message));
        }
        parts[count] = field
            .trim()
            .parse::<u8>()
            .map_err(|_| invalid("PASV host-port field out of range", message))?;
        count += 1;
    }
    if count != 6 {
        return Err(invalid("PASV host-port has too few fields", message));
    }

    let ip = Ipv4Addr::new(parts[0], parts[1], parts[2], parts[3]);
    let port = u16::from(parts[4]) * 256 + u16::from(parts[5]);
    Ok((ip, port))
}

/// Parse an EPSV reply message of the form
/// `Entering Extended Passive Mode (|||6446|)`.
///
/// Only the port is carried; the host is the control-connection peer.
pub fn parse_epsv(message: &str) -> Result<u16> {
    let start = message
        .find('(')
        .ok_or_else(|| invalid("EPSV reply without port", message))?;
    let end = message[start..]
        .find(')')
        .map(|i| start + i)
        .ok_or_else(|| invalid("EPSV reply without port", message))?;

    let inner = &message[start + 1..end];
    let fields: Vec<&str> = inner.split('|').collect();
    // (|||port|) splits into ["", "", "", "port", ""]; the protocol and
    // address fields must stay empty in a reply (RFC 2428 §3)
    if fields.len() != 5
        || !fields[0].is_empty()
        || !fields[1].is_empty()
        || !fields[2].is_empty()
        || !fields[4].is_empty()
    {
        return Err(invalid("malformed EPSV port specification", message));
    }
    fields[3]
        .parse::<u16>()
        .map_err(|_| invalid("EPSV port out of range", message))
}

/// Render PORT arguments (`h1,h2,h3,h4,p1,p2`) for an IPv4 endpoint.
///
/// Fails for IPv6 addresses; those advertise via EPRT instead.
pub fn format_port_args(addr: &SocketAddr) -> Result<String> {
    match addr.ip() {
        IpAddr::V4(ip) => {
            let o = ip.octets();
            let port = addr.port();
            Ok(format!(
                "{},{},{},{},{},{}",
                o[0],
                o[1],
                o[2],
                o[3],
                port / 256,
                port % 256
            ))
        }
        IpAddr::V6(_) => Err(FtpError::InvalidResponse(format!(
            "PORT requires an IPv4 endpoint, got {}",
            addr
        ))),
    }
}

/// Render EPRT arguments (`|1|addr|port|` or `|2|addr|port|`).
pub fn format_eprt_args(addr: &SocketAddr) -> String {
    let protocol = match addr.ip() {
        IpAddr::V4(_) => 1,
        IpAddr::V6(_) => 2,
    };
    format!("|{}|{}|{}|", protocol, addr.ip(), addr.port())
}
