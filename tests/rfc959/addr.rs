//! Tests for PASV/EPSV/PORT/EPRT address codecs

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use ftp_rs::addr::{format_eprt_args, format_port_args, parse_epsv, parse_pasv};

#[test]
fn test_pasv_format_parse_round_trip() {
    // parse(format(ip, port)) must reproduce (ip, port) across the
    // octet range
    let octets = [0u8, 1, 10, 127, 200, 255];
    for &a in &octets {
        for &b in &octets {
            let ip = Ipv4Addr::new(a, b, 1, 2);
            for port in [0u16, 1, 255, 256, 21 * 256 + 7, 65535] {
                let addr = SocketAddr::new(IpAddr::V4(ip), port);
                let args = format_port_args(&addr).unwrap();
                let (parsed_ip, parsed_port) =
                    parse_pasv(&format!("Entering Passive Mode ({})", args)).unwrap();
                assert_eq!(parsed_ip, ip);
                assert_eq!(parsed_port, port);
            }
        }
    }
}

#[test]
fn test_pasv_with_surrounding_text() {
    let (ip, port) = parse_pasv("227 Entering Passive Mode (10,0,0,5,4,1).").unwrap();
    assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 5));
    assert_eq!(port, 1025);
}

#[test]
fn test_pasv_rejects_out_of_range_components() {
    for message in [
        "(256,1,1,1,1,1)",
        "(1,1,1,1,256,1)",
        "(1,1,1,1,1,999)",
        "(1,1,1,1,1)",
        "(1,1,1,1,1,1,1)",
        "(a,b,c,d,e,f)",
        "(,,,,,)",
        "()",
        "",
    ] {
        assert!(parse_pasv(message).is_err(), "should reject {:?}", message);
    }
}

#[test]
fn test_epsv_port_range() {
    for port in [0u16, 1, 21, 6446, 65535] {
        let message = format!("229 Entering Extended Passive Mode (|||{}|)", port);
        assert_eq!(parse_epsv(&message).unwrap(), port);
    }
}

#[test]
fn test_epsv_rejects_malformed() {
    for message in [
        "(|||65536|)",
        "(|||nope|)",
        "(||||)",
        "(|1|host|21|)extra field shape",
        "229 Ready",
        "",
    ] {
        assert!(parse_epsv(message).is_err(), "should reject {:?}", message);
    }
}

#[test]
fn test_port_rejects_ipv6() {
    let v6: SocketAddr = "[2001:db8::1]:2121".parse().unwrap();
    assert!(format_port_args(&v6).is_err());
}

#[test]
fn test_eprt_protocol_selection() {
    let v4: SocketAddr = "192.0.2.7:50000".parse().unwrap();
    assert_eq!(format_eprt_args(&v4), "|1|192.0.2.7|50000|");

    let v6: SocketAddr = "[2001:db8::1]:50000".parse().unwrap();
    assert_eq!(format_eprt_args(&v6), "|2|2001:db8::1|50000|");
}
