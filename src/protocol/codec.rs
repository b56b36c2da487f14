//! Address encoding for the data-channel commands
//!
//! PORT and PASV carry addresses as six comma-separated byte fields
//! `h1,h2,h3,h4,p1,p2` with the port split as `p1 * 256 + p2`. EPRT and
//! EPSV use the pipe-delimited form `|protocol|address|port|`.

use std::net::Ipv4Addr;

/// Decode a PORT argument of the form `h1,h2,h3,h4,p1,p2`.
///
/// Returns the advertised address and port, or `None` unless the
/// argument has exactly six byte-sized fields.
pub fn decode_port_argument(arg: &str) -> Option<(Ipv4Addr, u16)> {
    let fields: Vec<&str> = arg.split(',').collect();
    if fields.len() != 6 {
        return None;
    }

    let mut bytes = [0u8; 6];
    for (i, field) in fields.iter().enumerate() {
        bytes[i] = field.trim().parse().ok()?;
    }

    let host = Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]);
    let port = u16::from(bytes[4]) * 256 + u16::from(bytes[5]);
    Some((host, port))
}

/// Encode host and port as the six-field body of a 227 reply.
pub fn encode_pasv_fields(host: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = host.octets();
    format!("{},{},{},{},{},{}", h1, h2, h3, h4, port / 256, port % 256)
}

/// Decode an EPRT argument of the form `|protocol|address|port|`.
///
/// Scans the delimited fields right to left and reads the first purely
/// numeric one as the port. The protocol and address fields are
/// tolerated but unused; active mode always dials the control peer.
pub fn decode_extended_argument(arg: &str) -> Option<u16> {
    arg.split('|')
        .rev()
        .find(|field| !field.is_empty() && field.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|field| field.parse().ok())
}

/// Encode the port as the body of a 229 reply, `|||port|`.
pub fn encode_epsv_fields(port: u16) -> String {
    format!("|||{}|", port)
}
