//! Authentication reply message for SOCKS5 username/password authentication.
//!
//! Defined in [RFC 1929, section 2](https://www.rfc-editor.org/rfc/rfc1929#section-2).
//!
//! After a client sends an authentication request, the server replies with
//! a 2-byte message:
//!
//! ```text
//! +----+--------+
//! |VER | STATUS |
//! +----+--------+
//! |  1 |   1    |
//! +----+--------+
//!
//! o VER    - the version of the subnegotiation (always 0x01)
//! o STATUS - 0x00 for success, any non-zero value indicates failure
//! ```
//!
//! If the status is non-zero, the client MUST close the connection.

/// Status of the authentication exchange.
///
/// RFC 1929 only distinguishes zero from non-zero; the non-zero values
/// mirror the reply codes used elsewhere (general failure for a message the
/// server could not parse, "not allowed" for a credential mismatch).
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// Authentication succeeded (`STATUS = 0x00`).
    Success = 0x00,
    /// The credential message was malformed.
    Malformed = 0x01,
    /// The supplied credentials did not match.
    Denied = 0x02,
}

/// Represents an authentication reply sent by the server.
pub struct AuthReply {
    /// The status of the authentication (`STATUS`).
    pub status: AuthStatus,
}

impl AuthReply {
    /// Creates a new `AuthReply` with the given status.
    pub fn new(status: AuthStatus) -> Self {
        Self { status }
    }

    /// Converts the `AuthReply` into its 2-byte wire format.
    ///
    /// Layout: `[VER, STATUS]`.
    pub fn to_bytes(&self) -> [u8; 2] {
        [0x01, self.status as u8]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form() {
        assert_eq!(AuthReply::new(AuthStatus::Success).to_bytes(), [0x01, 0x00]);
        assert_eq!(AuthReply::new(AuthStatus::Denied).to_bytes(), [0x01, 0x02]);
    }
}
