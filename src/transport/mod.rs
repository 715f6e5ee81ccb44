//! Transport layer for the DNS proxy.
//!
//! `udp` holds the per-family listener that serves clients, `upstream` the
//! one-shot relay to the configured resolver.

pub mod udp;
pub mod upstream;

/// Maximum size of a DNS message over UDP without EDNS0.
pub const MAX_DNS_PACKET_SIZE: usize = 512;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tracing::{debug, warn};

use crate::dns::ResponseCode;
use crate::resolver::Verdict;

use upstream::RelayError;

/// Address family a listener serves, used to tag log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => AddressFamily::Ipv4,
            SocketAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Ipv4 => "IPv4",
            AddressFamily::Ipv6 => "IPv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logger for DNS query events.
pub struct QueryLogger {
    family: AddressFamily,
}

impl QueryLogger {
    pub fn new(family: AddressFamily) -> Self {
        Self { family }
    }

    /// A response synthesized without contacting upstream.
    pub fn answered(
        &self,
        domain: &str,
        client: SocketAddr,
        verdict: Verdict,
        code: ResponseCode,
        elapsed: Duration,
    ) {
        debug!(
            family = %self.family,
            domain,
            client = %client,
            verdict = %verdict,
            rcode = %code,
            total_ms = millis(elapsed),
            "Answered locally"
        );
    }

    pub fn forwarded(
        &self,
        domain: &str,
        client: SocketAddr,
        total: Duration,
        upstream: Duration,
        first_address: Option<IpAddr>,
    ) {
        match first_address {
            Some(addr) => debug!(
                family = %self.family,
                domain,
                client = %client,
                answer = %addr,
                total_ms = millis(total),
                upstream_ms = millis(upstream),
                "Forwarded"
            ),
            None => debug!(
                family = %self.family,
                domain,
                client = %client,
                total_ms = millis(total),
                upstream_ms = millis(upstream),
                "Forwarded"
            ),
        }
    }

    pub fn server_failure(&self, domain: &str, client: SocketAddr, error: &RelayError) {
        warn!(
            family = %self.family,
            domain,
            client = %client,
            error = %error,
            "Upstream relay failed, answering SERVER_FAILURE"
        );
    }

    /// A datagram too short to carry a header; nothing can be sent back.
    pub fn dropped(&self, client: SocketAddr, len: usize) {
        debug!(family = %self.family, client = %client, len, "Dropped runt datagram");
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
