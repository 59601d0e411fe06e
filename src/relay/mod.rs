//! Relay data planes: TCP splice and the UDP relay.

pub mod tcp;
pub mod udp;
