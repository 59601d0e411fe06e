//! Name resolution facade.
//!
//! Turns a parsed destination into a single socket address for both TCP
//! connects and UDP upstream sockets. Literal addresses pass through
//! untouched; domain names go through the system resolver.

use std::net::{IpAddr, SocketAddr};

use tokio::net::lookup_host;

use crate::error::SocksError;
use crate::parse::AddrPort;

/// Resolves `dst` to one socket address.
///
/// When `preferred` is set (the configured outgoing source address), the
/// first resolved entry of the matching family wins; otherwise the first
/// entry wins.
pub async fn target_addr(
    dst: &AddrPort,
    preferred: Option<IpAddr>,
) -> Result<SocketAddr, SocksError> {
    match dst {
        AddrPort::V4(ip, port) => Ok(SocketAddr::from((*ip, *port))),
        AddrPort::V6(ip, port) => Ok(SocketAddr::from((*ip, *port))),
        AddrPort::Domain(host, port) => {
            let addrs: Vec<SocketAddr> = lookup_host((host.as_str(), *port))
                .await
                .map_err(|_| SocksError::Unresolvable(host.clone()))?
                .collect();
            let want_v4 = preferred.map(|ip| ip.is_ipv4());
            addrs
                .iter()
                .find(|a| want_v4.is_none_or(|v4| a.is_ipv4() == v4))
                .or_else(|| addrs.first())
                .copied()
                .ok_or_else(|| SocksError::Unresolvable(host.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn literals_pass_through() {
        let dst = AddrPort::V4(Ipv4Addr::new(192, 0, 2, 1), 80);
        let addr = target_addr(&dst, None).await.unwrap();
        assert_eq!(addr, "192.0.2.1:80".parse().unwrap());
    }

    #[tokio::test]
    async fn localhost_resolves() {
        let dst = AddrPort::Domain("localhost".into(), 1080);
        let addr = target_addr(&dst, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)))
            .await
            .unwrap();
        assert_eq!(addr.port(), 1080);
        assert!(addr.ip().is_loopback());
    }
}
