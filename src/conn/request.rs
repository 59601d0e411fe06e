//! SOCKS5 client connection request (RFC 1928 §4).
//!
//! After negotiation, the client sends a request message:
//!
//! ```text
//! +----+-----+-------+------+----------+----------+
//! |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
//! +----+-----+-------+------+----------+----------+
//! | 1  |  1  | X'00' |  1   | Variable |    2     |
//! +----+-----+-------+------+----------+----------+
//!
//! o VER      - protocol version: X'05'
//! o CMD      - command code:
//!                0x01 = CONNECT
//!                0x02 = BIND
//!                0x03 = UDP ASSOCIATE
//! o RSV      - reserved, must be 0x00
//! o ATYP     - address type of DST.ADDR
//! o DST.ADDR - destination address
//! o DST.PORT - destination port in network byte order
//! ```

use std::fmt;

use crate::error::SocksError;
use crate::parse::AddrPort;

/// The command (`CMD`) of a SOCKS5 request (RFC 1928 §4).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// CONNECT (0x01): establish a TCP connection to the target host.
    Connect = 0x01,
    /// BIND (0x02): recognized on the wire, rejected at dispatch.
    Bind = 0x02,
    /// UDP ASSOCIATE (0x03): establish a UDP relay.
    UdpAssociate = 0x03,
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::Connect => write!(f, "CONNECT"),
            Cmd::Bind => write!(f, "BIND"),
            Cmd::UdpAssociate => write!(f, "UDP_ASSOCIATE"),
        }
    }
}

/// Represents a SOCKS5 connection request (RFC 1928 §4).
#[derive(Debug)]
pub struct ConnRequest {
    /// Command: CONNECT, BIND, or UDP ASSOCIATE.
    pub cmd: Cmd,
    /// Destination address and port (`DST.ADDR`, `DST.PORT`).
    pub dst: AddrPort,
}

impl ConnRequest {
    /// Serializes the request into the SOCKS5 wire format (client side;
    /// used by the tests to drive the server).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0x05, self.cmd as u8, 0x00];
        buf.extend_from_slice(&self.dst.encode());
        buf
    }
}

impl TryFrom<&[u8]> for ConnRequest {
    type Error = SocksError;

    /// Parses a SOCKS5 connection request from raw bytes.
    ///
    /// # Errors
    /// - [`SocksError::RequestTooShort`] if mandatory fields are missing.
    /// - [`SocksError::UnsupportedVersion`] if `VER != 0x05`.
    /// - [`SocksError::UnsupportedCommand`] for an unknown `CMD` byte.
    /// - [`SocksError::NonZeroReserved`] if `RSV != 0x00`.
    /// - Address codec errors for the `ATYP`/`DST` fields.
    fn try_from(buf: &[u8]) -> Result<Self, Self::Error> {
        if buf.len() < 4 {
            return Err(SocksError::RequestTooShort);
        }

        let ver = buf[0];
        if ver != 0x05 {
            return Err(SocksError::UnsupportedVersion(ver));
        }

        let cmd = match buf[1] {
            0x01 => Cmd::Connect,
            0x02 => Cmd::Bind,
            0x03 => Cmd::UdpAssociate,
            other => return Err(SocksError::UnsupportedCommand(other)),
        };

        if buf[2] != 0x00 {
            return Err(SocksError::NonZeroReserved(buf[2]));
        }

        let (dst, _) = AddrPort::decode(&buf[3..])?;

        Ok(ConnRequest { cmd, dst })
    }
}

impl fmt::Display for ConnRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.cmd, self.dst)
    }
}
