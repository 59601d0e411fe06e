//! SOCKS5 method negotiation messages and identifiers.

pub mod message;
pub mod method;
