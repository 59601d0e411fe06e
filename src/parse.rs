//! SOCKS5 address tuple codec.
//!
//! This module defines [`AddrPort`], a destination or bound address
//! (IPv4, IPv6, or domain) with its port, and the codec for the wire form
//! shared by request headers, replies, and the UDP datagram header:
//!
//! ```text
//! +------+----------+----------+
//! | ATYP |   ADDR   |   PORT   |
//! +------+----------+----------+
//! |  1   | Variable |    2     |
//! +------+----------+----------+
//! ```
//!
//! `ATYP` is `0x01` (IPv4, 4 address bytes), `0x03` (domain, one length byte
//! followed by up to 255 name bytes, not NUL-terminated), or `0x04`
//! (IPv6, 16 address bytes). The port is big-endian. The address formats are
//! defined in [RFC 1928 §5, "Addressing"](<https://www.rfc-editor.org/rfc/rfc1928#section-5>).

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::SocksError;

/// IPv4 address type byte.
pub const ATYP_V4: u8 = 0x01;
/// Domain name address type byte.
pub const ATYP_DOMAIN: u8 = 0x03;
/// IPv6 address type byte.
pub const ATYP_V6: u8 = 0x04;

/// Represents a destination or bound address and port.
///
/// SOCKS5 requests, replies, and UDP datagram headers contain an address
/// field that may be:
/// - An IPv4 address (`ATYP = 0x01`).
/// - A domain name (`ATYP = 0x03`), represented here as [`AddrPort::Domain`].
/// - An IPv6 address (`ATYP = 0x04`).
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum AddrPort {
    /// An IPv4 address and port.
    V4(Ipv4Addr, u16),

    /// An IPv6 address and port.
    V6(Ipv6Addr, u16),

    /// A domain name and port.
    Domain(String, u16),
}

impl fmt::Display for AddrPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrPort::V4(ip, port) => write!(f, "{}:{}", ip, port),
            AddrPort::V6(ip, port) => write!(f, "[{}]:{}", ip, port),
            AddrPort::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for AddrPort {
    fn from(addr: SocketAddr) -> Self {
        match addr.ip() {
            IpAddr::V4(ip) => AddrPort::V4(ip, addr.port()),
            IpAddr::V6(ip) => AddrPort::V6(ip, addr.port()),
        }
    }
}

impl AddrPort {
    /// Decodes an address tuple starting at `buf[0]` (the ATYP byte).
    ///
    /// Returns the parsed address and the number of bytes consumed, covering
    /// the ATYP byte, the address field, and the port. Every length check
    /// precedes the corresponding read.
    ///
    /// # Errors
    /// - [`SocksError::TruncatedAddress`] if the buffer is shorter than the
    ///   address type requires.
    /// - [`SocksError::AddressTypeNotSupported`] for an unknown ATYP.
    pub fn decode(buf: &[u8]) -> Result<(AddrPort, usize), SocksError> {
        let atyp = *buf.first().ok_or(SocksError::TruncatedAddress)?;
        match atyp {
            ATYP_V4 => {
                if buf.len() < 7 {
                    return Err(SocksError::TruncatedAddress);
                }
                let ip = Ipv4Addr::new(buf[1], buf[2], buf[3], buf[4]);
                let port = u16::from_be_bytes([buf[5], buf[6]]);
                Ok((AddrPort::V4(ip, port), 7))
            }
            ATYP_V6 => {
                if buf.len() < 19 {
                    return Err(SocksError::TruncatedAddress);
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[1..17]);
                let port = u16::from_be_bytes([buf[17], buf[18]]);
                Ok((AddrPort::V6(Ipv6Addr::from(octets), port), 19))
            }
            ATYP_DOMAIN => {
                if buf.len() < 2 {
                    return Err(SocksError::TruncatedAddress);
                }
                let len = buf[1] as usize;
                if buf.len() < 2 + len + 2 {
                    return Err(SocksError::TruncatedAddress);
                }
                let domain = String::from_utf8_lossy(&buf[2..2 + len]).into_owned();
                let port = u16::from_be_bytes([buf[2 + len], buf[3 + len]]);
                Ok((AddrPort::Domain(domain, port), 2 + len + 2))
            }
            other => Err(SocksError::AddressTypeNotSupported(other)),
        }
    }

    /// Encodes this address as ATYP + address + big-endian port.
    ///
    /// IPv4 encodes to 7 bytes and IPv6 to 19. The server never produces the
    /// domain form itself, but encoding it is supported for client-side use.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(19);
        match self {
            AddrPort::V4(ip, port) => {
                buf.push(ATYP_V4);
                buf.extend_from_slice(&ip.octets());
                buf.extend_from_slice(&port.to_be_bytes());
            }
            AddrPort::V6(ip, port) => {
                buf.push(ATYP_V6);
                buf.extend_from_slice(&ip.octets());
                buf.extend_from_slice(&port.to_be_bytes());
            }
            AddrPort::Domain(name, port) => {
                buf.push(ATYP_DOMAIN);
                buf.push(name.len() as u8);
                buf.extend_from_slice(name.as_bytes());
                buf.extend_from_slice(&port.to_be_bytes());
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_ipv4() {
        let buf = [0x01, 127, 0, 0, 1, 0x1F, 0x90];
        let (addr, used) = AddrPort::decode(&buf).unwrap();
        assert_eq!(addr, AddrPort::V4(Ipv4Addr::new(127, 0, 0, 1), 8080));
        assert_eq!(used, 7);
    }

    #[test]
    fn decode_ipv6() {
        let mut buf = vec![0x04];
        buf.extend_from_slice(&Ipv6Addr::LOCALHOST.octets());
        buf.extend_from_slice(&443u16.to_be_bytes());
        let (addr, used) = AddrPort::decode(&buf).unwrap();
        assert_eq!(addr, AddrPort::V6(Ipv6Addr::LOCALHOST, 443));
        assert_eq!(used, 19);
    }

    #[test]
    fn decode_domain() {
        let mut buf = vec![0x03, 11];
        buf.extend_from_slice(b"example.com");
        buf.extend_from_slice(&80u16.to_be_bytes());
        buf.extend_from_slice(b"trailing payload");
        let (addr, used) = AddrPort::decode(&buf).unwrap();
        assert_eq!(addr, AddrPort::Domain("example.com".into(), 80));
        assert_eq!(used, 15);
    }

    #[test]
    fn decode_refuses_short_buffers() {
        assert!(matches!(
            AddrPort::decode(&[]),
            Err(SocksError::TruncatedAddress)
        ));
        // IPv4 missing one port byte.
        assert!(matches!(
            AddrPort::decode(&[0x01, 1, 2, 3, 4, 0]),
            Err(SocksError::TruncatedAddress)
        ));
        // Domain whose declared length exceeds the buffer.
        assert!(matches!(
            AddrPort::decode(&[0x03, 200, b'a', b'b']),
            Err(SocksError::TruncatedAddress)
        ));
    }

    #[test]
    fn decode_refuses_unknown_atyp() {
        assert!(matches!(
            AddrPort::decode(&[0x02, 0, 0, 0, 0, 0, 0]),
            Err(SocksError::AddressTypeNotSupported(0x02))
        ));
    }

    #[test]
    fn encode_decode_round_trip() {
        let v4 = AddrPort::V4(Ipv4Addr::new(10, 0, 0, 7), 1080);
        let v6 = AddrPort::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 53);
        for addr in [v4, v6] {
            let encoded = addr.encode();
            let (decoded, used) = AddrPort::decode(&encoded).unwrap();
            assert_eq!(decoded, addr);
            assert_eq!(used, encoded.len());
        }
    }
}
