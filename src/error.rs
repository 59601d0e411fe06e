//! SOCKS5 error definitions.
//!
//! This module defines [`SocksError`], the unified error type used across the
//! server. Errors are grouped by protocol phase:
//! - **Version / Method Selection** (RFC 1928 §3).
//! - **Authentication** (RFC 1929).
//! - **Requests** (RFC 1928 §4–5).
//! - **General I/O errors** from the underlying transport.

use thiserror::Error;

/// Represents all possible errors that can occur while serving SOCKS5.
#[derive(Debug, Error)]
pub enum SocksError {
    // ===== Version / Method Selection =====
    /// The client requested an unsupported SOCKS protocol version.
    #[error("unsupported SOCKS version: {0}")]
    UnsupportedVersion(u8),

    /// The client's method negotiation message was too short.
    #[error("method negotiation message too short")]
    NegotiationTooShort,

    /// The method negotiation message was missing declared method bytes.
    #[error("method list truncated")]
    IncompleteMethodList,

    /// None of the methods the client offered is acceptable.
    #[error("no acceptable authentication method")]
    NoAcceptableMethod,

    // ===== Authentication =====
    /// The client used an unsupported auth subnegotiation version.
    #[error("unsupported auth subnegotiation version: {0}")]
    UnsupportedAuthVersion(u8),

    /// The credential message had inconsistent length fields.
    #[error("malformed credential message")]
    MalformedCredentials,

    /// The supplied username/password did not match.
    #[error("credentials rejected")]
    CredentialsRejected,

    // ===== Requests =====
    /// The request message was too short to contain mandatory fields.
    #[error("request too short")]
    RequestTooShort,

    /// The client requested a command other than CONNECT or UDP ASSOCIATE.
    #[error("unsupported command: {0}")]
    UnsupportedCommand(u8),

    /// A reserved byte was not zero.
    #[error("reserved byte must be zero, got {0:#04x}")]
    NonZeroReserved(u8),

    /// The client specified an unknown address type.
    #[error("address type not supported: {0}")]
    AddressTypeNotSupported(u8),

    /// An address field was shorter than its type requires.
    #[error("address field truncated")]
    TruncatedAddress,

    /// Name resolution produced no usable address.
    #[error("no usable address for {0}")]
    Unresolvable(String),

    // ===== General =====
    /// A general I/O error occurred in the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
