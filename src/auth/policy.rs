//! Process-wide authentication policy.
//!
//! Holds the optional configured credential pair and, when auth-once mode is
//! enabled, the set of client IPs that have already completed a successful
//! USERNAME/PASSWORD exchange. The set only ever grows; lookups take a read
//! lock and inserts take a write lock.

use std::collections::HashSet;
use std::net::IpAddr;

use tokio::sync::RwLock;

use crate::msg::method::{FixedMethod, Method};

/// Authentication policy shared by every client session.
///
/// Built once before the accept loop starts. The authed-IP set is the only
/// mutable part and is guarded by a readers-writer lock.
pub struct AuthPolicy {
    creds: Option<Credentials>,
    /// `Some` when auth-once mode is enabled.
    authed_ips: Option<RwLock<HashSet<IpAddr>>>,
}

struct Credentials {
    user: Vec<u8>,
    pass: Vec<u8>,
}

impl AuthPolicy {
    /// A policy accepting every client with NO AUTH.
    pub fn open() -> Self {
        Self {
            creds: None,
            authed_ips: None,
        }
    }

    /// Require the given username/password pair.
    pub fn set_credentials(&mut self, user: impl Into<Vec<u8>>, pass: impl Into<Vec<u8>>) {
        self.creds = Some(Credentials {
            user: user.into(),
            pass: pass.into(),
        });
    }

    /// Enable auth-once: once a client IP has authenticated successfully it
    /// may use NO AUTH on later connections.
    pub fn enable_auth_once(&mut self) {
        if self.authed_ips.is_none() {
            self.authed_ips = Some(RwLock::new(HashSet::new()));
        }
    }

    /// Selects the authentication method for a client offering `offered`,
    /// connecting from `peer`.
    ///
    /// Selection order:
    /// 1. No credentials configured → NO AUTH iff offered, else no
    ///    acceptable method.
    /// 2. Auth-once enabled and `peer` already authed and NO AUTH offered →
    ///    NO AUTH.
    /// 3. USERNAME/PASSWORD offered → USERNAME/PASSWORD.
    /// 4. Otherwise no acceptable method.
    pub async fn select_method(&self, offered: &[Method], peer: IpAddr) -> Method {
        let no_auth = offered.contains(&Method::Fixed(FixedMethod::NoAuth));
        let use_pass = offered.contains(&Method::Fixed(FixedMethod::UsePass));

        if self.creds.is_none() {
            return if no_auth {
                Method::Fixed(FixedMethod::NoAuth)
            } else {
                Method::Fixed(FixedMethod::NoAcceptable)
            };
        }
        if no_auth && self.is_authed(peer).await {
            return Method::Fixed(FixedMethod::NoAuth);
        }
        if use_pass {
            Method::Fixed(FixedMethod::UsePass)
        } else {
            Method::Fixed(FixedMethod::NoAcceptable)
        }
    }

    /// Byte-exact credential check; no case folding, no encoding assumption.
    pub fn verify(&self, uname: &[u8], passwd: &[u8]) -> bool {
        match &self.creds {
            Some(c) => c.user == uname && c.pass == passwd,
            None => false,
        }
    }

    /// Records a successful authentication from `peer`. A no-op unless
    /// auth-once is enabled; duplicate inserts are skipped by the set.
    pub async fn remember(&self, peer: IpAddr) {
        if let Some(set) = &self.authed_ips {
            set.write().await.insert(peer);
        }
    }

    async fn is_authed(&self, peer: IpAddr) -> bool {
        match &self.authed_ips {
            Some(set) => set.read().await.contains(&peer),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const NO_AUTH: Method = Method::Fixed(FixedMethod::NoAuth);
    const USE_PASS: Method = Method::Fixed(FixedMethod::UsePass);
    const INVALID: Method = Method::Fixed(FixedMethod::NoAcceptable);

    fn peer() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))
    }

    #[tokio::test]
    async fn open_policy_only_accepts_no_auth() {
        let policy = AuthPolicy::open();
        assert_eq!(policy.select_method(&[NO_AUTH], peer()).await, NO_AUTH);
        assert_eq!(policy.select_method(&[USE_PASS], peer()).await, INVALID);
    }

    #[tokio::test]
    async fn credentials_demand_userpass() {
        let mut policy = AuthPolicy::open();
        policy.set_credentials("u", "p");
        assert_eq!(policy.select_method(&[NO_AUTH], peer()).await, INVALID);
        assert_eq!(
            policy.select_method(&[NO_AUTH, USE_PASS], peer()).await,
            USE_PASS
        );
    }

    #[tokio::test]
    async fn auth_once_admits_known_peer() {
        let mut policy = AuthPolicy::open();
        policy.set_credentials("u", "p");
        policy.enable_auth_once();

        assert_eq!(policy.select_method(&[NO_AUTH], peer()).await, INVALID);
        policy.remember(peer()).await;
        assert_eq!(policy.select_method(&[NO_AUTH], peer()).await, NO_AUTH);

        // A different IP still has to authenticate.
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 8));
        assert_eq!(policy.select_method(&[NO_AUTH], other).await, INVALID);
    }

    #[tokio::test]
    async fn remember_skips_duplicates() {
        let mut policy = AuthPolicy::open();
        policy.set_credentials("u", "p");
        policy.enable_auth_once();
        policy.remember(peer()).await;
        policy.remember(peer()).await;
        let set = policy.authed_ips.as_ref().unwrap().read().await;
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn remember_is_a_no_op_without_auth_once() {
        let mut policy = AuthPolicy::open();
        policy.set_credentials("u", "p");
        policy.remember(peer()).await;
        assert_eq!(policy.select_method(&[NO_AUTH], peer()).await, INVALID);
    }

    #[test]
    fn verify_is_byte_exact() {
        let mut policy = AuthPolicy::open();
        policy.set_credentials("User", "Pass");
        assert!(policy.verify(b"User", b"Pass"));
        assert!(!policy.verify(b"user", b"pass"));
        assert!(!policy.verify(b"User", b"Pas"));
    }
}
