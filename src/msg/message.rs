//! SOCKS5 handshake messages (RFC 1928).
//!
//! This module defines the messages exchanged during the initial
//! client–server handshake:
//!
//! - [`VersionMessage`] → sent by the client to advertise supported
//!   authentication methods.
//! - [`MethodSelection`] → sent by the server to choose one method.
//!
//! These are defined in [RFC 1928, section 3](https://www.rfc-editor.org/rfc/rfc1928#section-3).

use super::method::Method;
use crate::error::SocksError;

/// Client's version/methods message.
///
/// This message is sent by the client immediately after establishing
/// a TCP connection, and lists the authentication methods it supports.
///
/// ```text
/// +----+----------+----------+
/// |VER | NMETHODS | METHODS  |
/// +----+----------+----------+
/// | 1  |    1     | 1 to 255 |
/// +----+----------+----------+
/// ```
///
/// - `VER`: SOCKS version (`0x05`).
/// - `NMETHODS`: number of methods that follow.
/// - `METHODS`: list of supported authentication methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    /// The list of authentication methods supported by the client.
    pub methods: Vec<Method>,
}

impl TryFrom<&[u8]> for VersionMessage {
    type Error = SocksError;

    /// Attempts to parse a [`VersionMessage`] from raw bytes.
    ///
    /// Returns an error if:
    /// - the buffer is shorter than 2 bytes
    /// - the version is not `0x05`
    /// - the buffer does not contain the declared number of methods
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < 2 {
            return Err(SocksError::NegotiationTooShort);
        }

        let ver = bytes[0];
        if ver != 0x05 {
            return Err(SocksError::UnsupportedVersion(ver));
        }

        let nmethods = bytes[1] as usize;
        if bytes.len() < 2 + nmethods {
            return Err(SocksError::IncompleteMethodList);
        }

        let methods = bytes[2..2 + nmethods]
            .iter()
            .map(|b| Method::from(*b))
            .collect();

        Ok(Self { methods })
    }
}

/// Server's method selection message.
///
/// This message is sent in response to a [`VersionMessage`],
/// informing the client which authentication method has been chosen.
///
/// ```text
/// +----+--------+
/// |VER | METHOD |
/// +----+--------+
/// | 1  |   1    |
/// +----+--------+
/// ```
///
/// - `VER`: SOCKS version (`0x05`).
/// - `METHOD`: one of the methods proposed by the client, or `0xFF`
///   if none are acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSelection {
    /// The authentication method selected by the server.
    pub method: Method,
}

impl MethodSelection {
    /// Creates a new [`MethodSelection`] with the given method.
    pub fn new(method: Method) -> Self {
        Self { method }
    }

    /// Serializes this [`MethodSelection`] into its 2-byte wire form.
    pub fn to_bytes(&self) -> [u8; 2] {
        [0x05, self.method.to_u8()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::method::FixedMethod;

    #[test]
    fn parse_method_list() {
        let msg = VersionMessage::try_from(&[0x05, 0x02, 0x00, 0x02][..]).unwrap();
        assert_eq!(
            msg.methods,
            vec![
                Method::Fixed(FixedMethod::NoAuth),
                Method::Fixed(FixedMethod::UsePass)
            ]
        );
    }

    #[test]
    fn reject_wrong_version() {
        assert!(matches!(
            VersionMessage::try_from(&[0x04, 0x01, 0x00][..]),
            Err(SocksError::UnsupportedVersion(0x04))
        ));
    }

    #[test]
    fn reject_truncated_method_list() {
        assert!(matches!(
            VersionMessage::try_from(&[0x05, 0x03, 0x00][..]),
            Err(SocksError::IncompleteMethodList)
        ));
    }

    #[test]
    fn selection_wire_form() {
        let sel = MethodSelection::new(Method::Fixed(FixedMethod::NoAcceptable));
        assert_eq!(sel.to_bytes(), [0x05, 0xFF]);
    }
}
