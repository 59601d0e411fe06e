//! UDP relay for UDP ASSOCIATE sessions (RFC 1928 §7).
//!
//! One server-side socket faces the client. Every datagram the client sends
//! carries a SOCKS5 UDP header naming its target:
//!
//! ```text
//! +----+------+------+----------+----------+----------+
//! |RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
//! +----+------+------+----------+----------+----------+
//! | 2  |  1   |  1   | Variable |    2     | Variable |
//! +----+------+------+----------+----------+----------+
//! ```
//!
//! Each distinct target gets its own connected upstream socket, created on
//! the first datagram to it and kept until teardown. The map is keyed by the
//! raw encoded address-tuple bytes, not the resolved address, so replies can
//! echo back exactly the tuple the client used. Fragmented datagrams
//! (FRAG ≠ 0) are dropped.
//!
//! The client's TCP control connection stays open for the lifetime of the
//! association; any byte, EOF, or error on it tears the relay down.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SocksError;
use crate::parse::AddrPort;
use crate::relay::tcp::IDLE_TIMEOUT;
use crate::resolve;

/// Datagrams up to 4 KiB including the SOCKS5 header.
const DATAGRAM_BUF: usize = 4096;

/// A connected per-target socket and its reply pump.
struct Upstream {
    sock: Arc<UdpSocket>,
    pump: JoinHandle<()>,
}

/// State shared between the relay loop and the reply pumps.
struct Shared {
    /// Refreshed on every client datagram and every upstream reply.
    last_active: Mutex<Instant>,
    /// Source of the most recent well-formed client datagram.
    client: Mutex<Option<SocketAddr>>,
}

/// A UDP relay bound for one ASSOCIATE session.
pub struct UdpRelay {
    sock: Arc<UdpSocket>,
    bind_ip: Option<IpAddr>,
    targets: HashMap<Vec<u8>, Upstream>,
    shared: Arc<Shared>,
}

impl UdpRelay {
    /// Binds the client-facing socket on an OS-chosen port. The family
    /// follows the configured outgoing address; unspecified IPv4 otherwise.
    pub async fn bind(bind_ip: Option<IpAddr>) -> io::Result<UdpRelay> {
        let local: SocketAddr = match bind_ip {
            Some(IpAddr::V6(_)) => (Ipv6Addr::UNSPECIFIED, 0).into(),
            _ => (Ipv4Addr::UNSPECIFIED, 0).into(),
        };
        let sock = UdpSocket::bind(local).await?;
        Ok(UdpRelay {
            sock: Arc::new(sock),
            bind_ip,
            targets: HashMap::new(),
            shared: Arc::new(Shared {
                last_active: Mutex::new(Instant::now()),
                client: Mutex::new(None),
            }),
        })
    }

    /// The endpoint the client must send its datagrams to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.sock.local_addr()
    }

    /// Runs the relay until the control stream closes, the idle timeout
    /// expires, or an upstream socket cannot be created.
    ///
    /// An `Err` means the caller still owes the client a SOCKS5 error reply
    /// on the control stream; teardown has already happened either way.
    pub async fn run(mut self, control: &mut TcpStream) -> Result<(), SocksError> {
        let sock = Arc::clone(&self.sock);
        let mut ctl_buf = [0u8; 512];
        let mut buf = [0u8; DATAGRAM_BUF];

        let result = loop {
            let deadline = *self.shared.last_active.lock().unwrap() + IDLE_TIMEOUT;
            tokio::select! {
                // Any control-channel data, EOF, or error ends the session.
                _ = control.read(&mut ctl_buf) => break Ok(()),
                res = sock.recv_from(&mut buf) => {
                    let (n, from) = match res {
                        Ok(pair) => pair,
                        Err(e) => {
                            debug!(error = %e, "udp recv failed");
                            continue;
                        }
                    };
                    if let Err(e) = self.on_client_datagram(&buf[..n], from).await {
                        break Err(e);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    // A reply pump may have refreshed the clock since the
                    // deadline was computed.
                    if self.shared.last_active.lock().unwrap().elapsed() >= IDLE_TIMEOUT {
                        break Ok(());
                    }
                }
            }
        };

        self.teardown();
        result
    }

    /// Handles one datagram from the client side.
    ///
    /// Malformed, fragmented, or unaddressable datagrams are dropped and the
    /// relay keeps running; only upstream socket creation failures are fatal
    /// to the session.
    async fn on_client_datagram(
        &mut self,
        pkt: &[u8],
        from: SocketAddr,
    ) -> Result<(), SocksError> {
        if pkt.len() < 4 || pkt[0] != 0 || pkt[1] != 0 {
            return Ok(());
        }
        if pkt[2] != 0 {
            // Fragmentation is unsupported.
            return Ok(());
        }
        let Ok((dst, consumed)) = AddrPort::decode(&pkt[3..]) else {
            return Ok(());
        };
        let key = &pkt[3..3 + consumed];
        let payload = &pkt[3 + consumed..];

        *self.shared.last_active.lock().unwrap() = Instant::now();
        *self.shared.client.lock().unwrap() = Some(from);

        if !self.targets.contains_key(key) {
            let upstream = self.open_upstream(&dst).await?;
            let pump = self.spawn_pump(key.to_vec(), Arc::clone(&upstream));
            debug!(target = %dst, "new udp target");
            self.targets.insert(
                key.to_vec(),
                Upstream {
                    sock: upstream,
                    pump,
                },
            );
        }

        let upstream = &self.targets[key];
        if let Err(e) = upstream.sock.send(payload).await {
            debug!(target = %dst, error = %e, "upstream send failed");
        }
        Ok(())
    }

    /// Opens and connects a socket for a new target.
    async fn open_upstream(&self, dst: &AddrPort) -> Result<Arc<UdpSocket>, SocksError> {
        let target = resolve::target_addr(dst, self.bind_ip).await?;
        let local: SocketAddr = match self.bind_ip {
            Some(ip) if ip.is_ipv4() == target.is_ipv4() => (ip, 0).into(),
            _ if target.is_ipv4() => (Ipv4Addr::UNSPECIFIED, 0).into(),
            _ => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let sock = UdpSocket::bind(local).await?;
        sock.connect(target).await?;
        Ok(Arc::new(sock))
    }

    /// Spawns the reply pump for one target: receive from the connected
    /// peer, reframe with the exact tuple bytes the client used, send once
    /// to the client.
    fn spawn_pump(&self, key: Vec<u8>, upstream: Arc<UdpSocket>) -> JoinHandle<()> {
        let relay = Arc::clone(&self.sock);
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut buf = [0u8; DATAGRAM_BUF];
            loop {
                let n = match upstream.recv(&mut buf).await {
                    Ok(n) => n,
                    Err(_) => break,
                };
                let Some(client) = *shared.client.lock().unwrap() else {
                    break;
                };
                let mut pkt = Vec::with_capacity(3 + key.len() + n);
                pkt.extend_from_slice(&[0, 0, 0]);
                pkt.extend_from_slice(&key);
                pkt.extend_from_slice(&buf[..n]);
                *shared.last_active.lock().unwrap() = Instant::now();
                if let Err(e) = relay.send_to(&pkt, client).await {
                    warn!(error = %e, "reply to client failed");
                    break;
                }
            }
        })
    }

    /// Aborts every reply pump and drops every upstream socket.
    fn teardown(&mut self) {
        for (_, upstream) in self.targets.drain() {
            upstream.pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_family_of_outgoing_address() {
        let relay = UdpRelay::bind(None).await.unwrap();
        assert!(relay.local_addr().unwrap().is_ipv4());

        let relay = UdpRelay::bind(Some(IpAddr::V6(Ipv6Addr::LOCALHOST)))
            .await
            .unwrap();
        assert!(relay.local_addr().unwrap().is_ipv6());
    }
}
