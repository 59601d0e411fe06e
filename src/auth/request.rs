//! Authentication request message for SOCKS5 username/password authentication.
//!
//! Defined in [RFC 1929, section 2](https://www.rfc-editor.org/rfc/rfc1929#section-2).
//!
//! After selecting username/password authentication during method negotiation,
//! the client sends a request of the form:
//!
//! ```text
//! +----+------+----------+------+----------+
//! |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
//! +----+------+----------+------+----------+
//! |  1 |  1   | 1–255    |  1   | 1–255    |
//! +----+------+----------+------+----------+
//!
//! o VER     - subnegotiation version (always 0x01)
//! o ULEN    - length of username in bytes
//! o UNAME   - username (1–255 bytes)
//! o PLEN    - length of password in bytes
//! o PASSWD  - password (1–255 bytes)
//! ```
//!
//! Credentials are kept as raw bytes; RFC 1929 does not require any
//! particular encoding and the comparison against the configured pair is
//! byte-exact.

use crate::error::SocksError;

/// Represents an authentication request from a client (RFC 1929 §2).
pub struct AuthRequest {
    /// The username (`UNAME`).
    pub uname: Vec<u8>,
    /// The password (`PASSWD`).
    pub passwd: Vec<u8>,
}

impl TryFrom<&[u8]> for AuthRequest {
    type Error = SocksError;

    /// Parses an authentication request from raw bytes.
    ///
    /// Every declared length is checked against the buffer before the
    /// corresponding field is read.
    ///
    /// # Errors
    /// - [`SocksError::UnsupportedAuthVersion`] if `VER != 0x01`.
    /// - [`SocksError::MalformedCredentials`] if the buffer is truncated
    ///   relative to its length fields.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 2 {
            return Err(SocksError::MalformedCredentials);
        }

        let ver = bytes[0];
        if ver != 0x01 {
            return Err(SocksError::UnsupportedAuthVersion(ver));
        }

        let ulen = bytes[1] as usize;
        if bytes.len() < 2 + ulen + 1 {
            return Err(SocksError::MalformedCredentials);
        }
        let uname = bytes[2..2 + ulen].to_vec();

        let plen_index = 2 + ulen;
        let plen = bytes[plen_index] as usize;
        if bytes.len() < plen_index + 1 + plen {
            return Err(SocksError::MalformedCredentials);
        }
        let passwd = bytes[plen_index + 1..plen_index + 1 + plen].to_vec();

        Ok(Self { uname, passwd })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let req = AuthRequest::try_from(&[0x01, 0x01, b'u', 0x01, b'p'][..]).unwrap();
        assert_eq!(req.uname, b"u");
        assert_eq!(req.passwd, b"p");
    }

    #[test]
    fn reject_wrong_version() {
        assert!(matches!(
            AuthRequest::try_from(&[0x05, 0x01, b'u', 0x01, b'p'][..]),
            Err(SocksError::UnsupportedAuthVersion(0x05))
        ));
    }

    #[test]
    fn reject_truncated_username() {
        // ULEN says 4 bytes but only 1 follows.
        assert!(matches!(
            AuthRequest::try_from(&[0x01, 0x04, b'u'][..]),
            Err(SocksError::MalformedCredentials)
        ));
    }

    #[test]
    fn reject_truncated_password() {
        // PLEN says 2 bytes but only 1 follows.
        assert!(matches!(
            AuthRequest::try_from(&[0x01, 0x01, b'u', 0x02, b'p'][..]),
            Err(SocksError::MalformedCredentials)
        ));
    }

    #[test]
    fn non_utf8_credentials_accepted() {
        let req = AuthRequest::try_from(&[0x01, 0x02, 0xFF, 0xFE, 0x01, 0x80][..]).unwrap();
        assert_eq!(req.uname, [0xFF, 0xFE]);
        assert_eq!(req.passwd, [0x80]);
    }
}
