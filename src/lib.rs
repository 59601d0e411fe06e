//! A small, multi-connection SOCKS5 proxy server built on Tokio.
//!
//! This crate implements the SOCKS5 protocol (RFC 1928) with optional
//! username/password authentication (RFC 1929). It supports the TCP
//! `CONNECT` and `UDP ASSOCIATE` commands, an auth-once mode that
//! whitelists a client IP after one successful login, and an outgoing
//! source-address override.
//!
//! The BIND command and GSSAPI authentication are not supported; neither
//! are fragmented UDP datagrams.
//!
//! Each accepted client is served by its own task. The session walks the
//! protocol phases in order (method negotiation, credential exchange if
//! required, then the request) and hands the connection to one of the two
//! relay data planes in [`relay`].

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream, ToSocketAddrs};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub mod auth;
pub mod conn;
pub mod error;
pub mod msg;
pub mod parse;
pub mod relay;
pub mod resolve;

use auth::policy::AuthPolicy;
use auth::reply::{AuthReply, AuthStatus};
use auth::request::AuthRequest;
use conn::reply::{ConnReply, Rep};
use conn::request::{Cmd, ConnRequest};
use msg::message::{MethodSelection, VersionMessage};
use msg::method::{FixedMethod, Method};
use parse::AddrPort;
use relay::udp::UdpRelay;

use crate::error::SocksError;

/// Per-message read buffer. Every SOCKS5 control message fits; clients send
/// each one in a single segment.
const MSG_BUF: usize = 1024;

/// Backoff after an accept failure, so a persistent error (fd exhaustion)
/// does not spin the acceptor at 100% CPU.
const ACCEPT_BACKOFF: Duration = Duration::from_micros(64);

/// The SOCKS5 server.
///
/// Configure it after [`bind`](Socks5::bind), then call
/// [`run`](Socks5::run), which accepts clients forever.
pub struct Socks5 {
    listener: TcpListener,
    auth: AuthPolicy,
    bind_ip: Option<IpAddr>,
}

impl Socks5 {
    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns a `SocksError::Io` if binding fails.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, SocksError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            auth: AuthPolicy::open(),
            bind_ip: None,
        })
    }

    /// Require username/password authentication (RFC 1929).
    pub fn set_credentials(&mut self, user: impl Into<Vec<u8>>, pass: impl Into<Vec<u8>>) {
        self.auth.set_credentials(user, pass);
    }

    /// After one successful login, accept NO AUTH from the same client IP.
    /// Only meaningful together with [`set_credentials`](Socks5::set_credentials).
    pub fn enable_auth_once(&mut self) {
        self.auth.enable_auth_once();
    }

    /// Source address for outgoing TCP connections and UDP relay sockets.
    pub fn set_outgoing_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }

    /// Returns the local address of the listening socket.
    pub fn local_addr(&self) -> Result<SocketAddr, SocksError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients forever, one task per connection.
    ///
    /// Finished workers are reaped before each accept. Accept failures are
    /// logged and retried after a short backoff; they are never fatal.
    pub async fn run(self) -> Result<(), SocksError> {
        let server = Arc::new(self);
        let mut workers = JoinSet::new();
        loop {
            while workers.try_join_next().is_some() {}
            match server.listener.accept().await {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&server);
                    workers.spawn(async move {
                        if let Err(e) = server.handle_client(stream, peer).await {
                            debug!(client = %peer, "session closed: {e}");
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    /// Drives one client through negotiation, authentication, and dispatch.
    async fn handle_client(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<(), SocksError> {
        let mut buf = [0u8; MSG_BUF];

        // Method negotiation.
        let n = stream.read(&mut buf).await?;
        let hello = VersionMessage::try_from(&buf[..n])?;
        let method = self.auth.select_method(&hello.methods, peer.ip()).await;
        stream
            .write_all(&MethodSelection::new(method).to_bytes())
            .await?;

        match method {
            Method::Fixed(FixedMethod::NoAuth) => {}
            Method::Fixed(FixedMethod::UsePass) => {
                // Credential exchange.
                let n = stream.read(&mut buf).await?;
                let status = match AuthRequest::try_from(&buf[..n]) {
                    Ok(req) if self.auth.verify(&req.uname, &req.passwd) => AuthStatus::Success,
                    Ok(_) => AuthStatus::Denied,
                    Err(_) => AuthStatus::Malformed,
                };
                if status == AuthStatus::Success {
                    // Whitelist before replying, so a client that saw
                    // success can immediately reconnect with NO AUTH.
                    self.auth.remember(peer.ip()).await;
                }
                stream.write_all(&AuthReply::new(status).to_bytes()).await?;
                if status != AuthStatus::Success {
                    return Err(SocksError::CredentialsRejected);
                }
            }
            _ => return Err(SocksError::NoAcceptableMethod),
        }

        // Request.
        let n = stream.read(&mut buf).await?;
        let request = match ConnRequest::try_from(&buf[..n]) {
            Ok(request) => request,
            Err(e) => {
                stream
                    .write_all(&ConnReply::error(Rep::from(&e)).to_bytes())
                    .await?;
                return Err(e);
            }
        };
        debug!(client = %peer, request = %request, "request");

        match request.cmd {
            Cmd::Connect => self.connect(stream, peer, request.dst).await,
            Cmd::UdpAssociate => self.associate(stream, peer).await,
            Cmd::Bind => {
                stream
                    .write_all(&ConnReply::error(Rep::CommandNotSupported).to_bytes())
                    .await?;
                Err(SocksError::UnsupportedCommand(Cmd::Bind as u8))
            }
        }
    }

    /// CONNECT: open the upstream connection, reply with its local
    /// endpoint, then splice until one side closes.
    async fn connect(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        dst: AddrPort,
    ) -> Result<(), SocksError> {
        let mut upstream = match self.open_target(&dst).await {
            Ok(upstream) => upstream,
            Err(e) => {
                stream
                    .write_all(&ConnReply::error(Rep::from(&e)).to_bytes())
                    .await?;
                return Err(e);
            }
        };
        let bound = upstream.local_addr()?;
        info!(client = %peer, target = %dst, "connected");
        stream
            .write_all(&ConnReply::new(Rep::Succeeded, bound.into()).to_bytes())
            .await?;
        relay::tcp::splice(&mut stream, &mut upstream).await?;
        Ok(())
    }

    async fn open_target(&self, dst: &AddrPort) -> Result<TcpStream, SocksError> {
        let target = resolve::target_addr(dst, self.bind_ip).await?;
        let sock = if target.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        if let Some(ip) = self.bind_ip {
            if ip.is_ipv4() == target.is_ipv4() {
                sock.bind(SocketAddr::new(ip, 0))?;
            }
        }
        Ok(sock.connect(target).await?)
    }

    /// UDP ASSOCIATE: bind the relay, reply with its endpoint, then run the
    /// relay until the control connection closes or the session idles out.
    async fn associate(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<(), SocksError> {
        let relay = match UdpRelay::bind(self.bind_ip).await {
            Ok(relay) => relay,
            Err(e) => {
                let e = SocksError::from(e);
                stream
                    .write_all(&ConnReply::error(Rep::from(&e)).to_bytes())
                    .await?;
                return Err(e);
            }
        };
        let mut bound = relay.local_addr()?;
        if bound.ip().is_unspecified() {
            // The relay binds the wildcard; tell the client the address it
            // already reached us on.
            bound.set_ip(stream.local_addr()?.ip());
        }
        info!(client = %peer, relay = %bound, "udp associate");
        stream
            .write_all(&ConnReply::new(Rep::Succeeded, bound.into()).to_bytes())
            .await?;
        match relay.run(&mut stream).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = stream
                    .write_all(&ConnReply::error(Rep::from(&e)).to_bytes())
                    .await;
                Err(e)
            }
        }
    }
}
