//! Upstream relay.
//!
//! Each forwarded query gets its own ephemeral socket: send the client's
//! bytes unchanged, wait a bounded time for one datagram, hand it back.
//! No pooling, no retries.

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::time::Duration;

use thiserror::Error;
use tokio::net::{UdpSocket, lookup_host};

use super::MAX_DNS_PACKET_SIZE;

/// Port upstream resolvers are contacted on.
pub const DNS_PORT: u16 = 53;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("no upstream address configured")]
    NoUpstream,
    #[error("cannot open upstream socket: {0}")]
    Bind(#[source] io::Error),
    #[error("send to upstream failed: {0}")]
    Send(#[source] io::Error),
    #[error("receive from upstream failed: {0}")]
    Recv(#[source] io::Error),
    #[error("upstream did not answer within {0:?}")]
    Timeout(Duration),
}

/// Resolved upstream endpoints, at most one per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpstreamTarget {
    pub v4: Option<SocketAddrV4>,
    pub v6: Option<SocketAddrV6>,
}

impl UpstreamTarget {
    pub fn new(v4: Option<SocketAddrV4>, v6: Option<SocketAddrV6>) -> Self {
        Self { v4, v6 }
    }

    /// Keep the first address of each family.
    pub fn from_addrs(addrs: impl IntoIterator<Item = SocketAddr>) -> Self {
        let mut target = Self::default();
        for addr in addrs {
            match addr {
                SocketAddr::V4(v4) if target.v4.is_none() => target.v4 = Some(v4),
                SocketAddr::V6(v6) if target.v6.is_none() => target.v6 = Some(v6),
                _ => {}
            }
        }
        target
    }

    /// Resolve a hostname or address literal once, on the DNS port.
    pub async fn resolve(host: &str) -> io::Result<Self> {
        let addrs = lookup_host((host, DNS_PORT)).await?;
        Ok(Self::from_addrs(addrs))
    }

    /// IPv4 if configured, else IPv6.
    pub fn preferred(&self) -> Option<SocketAddr> {
        self.v4
            .map(SocketAddr::V4)
            .or_else(|| self.v6.map(SocketAddr::V6))
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_none() && self.v6.is_none()
    }
}

impl fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.v4, self.v6) {
            (Some(v4), Some(v6)) => write!(f, "{}, {}", v4, v6),
            (Some(v4), None) => write!(f, "{}", v4),
            (None, Some(v6)) => write!(f, "{}", v6),
            (None, None) => f.write_str("(none)"),
        }
    }
}

/// Forward a DNS query to the upstream server and return the response.
pub async fn relay(
    query: &[u8],
    target: &UpstreamTarget,
    timeout: Duration,
) -> Result<Vec<u8>, RelayError> {
    let upstream = target.preferred().ok_or(RelayError::NoUpstream)?;
    let local: SocketAddr = match upstream {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(local).await.map_err(RelayError::Bind)?;
    // Connecting filters out datagrams from anyone but the upstream.
    socket.connect(upstream).await.map_err(RelayError::Send)?;
    socket.send(query).await.map_err(RelayError::Send)?;

    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
    let len = tokio::time::timeout(timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| RelayError::Timeout(timeout))?
        .map_err(RelayError::Recv)?;

    Ok(buf[..len].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::{build_a_reply, build_query};

    #[test]
    fn preferred_picks_ipv4_first() {
        let target = UpstreamTarget::from_addrs([
            "[2001:db8::1]:53".parse::<SocketAddr>().unwrap(),
            "192.0.2.1:53".parse::<SocketAddr>().unwrap(),
            "192.0.2.2:53".parse::<SocketAddr>().unwrap(),
        ]);

        assert_eq!(target.preferred(), Some("192.0.2.1:53".parse().unwrap()));
        assert_eq!(target.to_string(), "192.0.2.1:53, [2001:db8::1]:53");
    }

    #[test]
    fn preferred_falls_back_to_ipv6() {
        let target = UpstreamTarget::from_addrs(["[2001:db8::1]:53".parse::<SocketAddr>().unwrap()]);

        assert_eq!(target.preferred(), Some("[2001:db8::1]:53".parse().unwrap()));
    }

    #[test]
    fn empty_target_has_no_preference() {
        let target = UpstreamTarget::default();

        assert!(target.is_empty());
        assert_eq!(target.preferred(), None);
        assert_eq!(target.to_string(), "(none)");
    }

    #[tokio::test]
    async fn resolve_accepts_ip_literal() {
        let target = UpstreamTarget::resolve("127.0.0.1").await.unwrap();

        assert_eq!(target.v4, Some("127.0.0.1:53".parse().unwrap()));
        assert!(target.v6.is_none());
    }

    #[tokio::test]
    async fn relay_without_upstream_fails() {
        let query = build_query(1, "example.com", 1, 1);

        let result = relay(&query, &UpstreamTarget::default(), Duration::from_millis(50)).await;

        assert!(matches!(result, Err(RelayError::NoUpstream)));
    }

    #[tokio::test]
    async fn relay_returns_upstream_reply() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(upstream_addr) = upstream.local_addr().unwrap() else {
            panic!("expected IPv4 address");
        };
        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
            let (len, src) = upstream.recv_from(&mut buf).await.unwrap();
            let reply = build_a_reply(&buf[..len], [93, 184, 216, 34]);
            upstream.send_to(&reply, src).await.unwrap();
        });
        let query = build_query(0x1234, "openai.com", 1, 1);
        let target = UpstreamTarget::new(Some(upstream_addr), None);

        let reply = relay(&query, &target, Duration::from_secs(1)).await.unwrap();

        assert_eq!(reply, build_a_reply(&query, [93, 184, 216, 34]));
    }

    #[tokio::test]
    async fn relay_times_out_on_silent_upstream() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let SocketAddr::V4(upstream_addr) = upstream.local_addr().unwrap() else {
            panic!("expected IPv4 address");
        };
        let query = build_query(1, "example.com", 1, 1);
        let target = UpstreamTarget::new(Some(upstream_addr), None);

        let result = relay(&query, &target, Duration::from_millis(100)).await;

        assert!(matches!(result, Err(RelayError::Timeout(_))));
        drop(upstream);
    }
}
