//! UDP listener for DNS queries.
//!
//! One listener per address family, each owning its socket. The loop is
//! strictly serial: wait for a datagram (bounded by the poll interval so
//! shutdown is noticed), classify it, answer locally or relay upstream,
//! send the reply, repeat.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dns::{ResponseCode, extract_first_address, synthesize_response};
use crate::proxy::ProxyContext;

use super::upstream::relay;
use super::{AddressFamily, MAX_DNS_PACKET_SIZE, QueryLogger};

/// UDP listener serving one address family.
pub struct UdpListener {
    socket: UdpSocket,
    family: AddressFamily,
}

impl UdpListener {
    /// Bind a listening socket.
    ///
    /// IPv6 sockets are bound v6-only so an IPv4 listener can share the port.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let domain = match addr {
            SocketAddr::V4(_) => Domain::IPV4,
            SocketAddr::V6(_) => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if addr.is_ipv6() {
            socket.set_only_v6(true)?;
        }
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        Self::from_socket(UdpSocket::from_std(socket.into())?)
    }

    /// Wrap an already bound socket.
    pub fn from_socket(socket: UdpSocket) -> io::Result<Self> {
        let family = AddressFamily::of(&socket.local_addr()?);
        Ok(Self { socket, family })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Spawn the listener loop on the runtime.
    pub fn start(self, ctx: Arc<ProxyContext>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(ctx, shutdown))
    }

    /// Serve queries until `shutdown` is cancelled. The socket is closed on
    /// return.
    pub async fn run(self, ctx: Arc<ProxyContext>, shutdown: CancellationToken) {
        let logger = QueryLogger::new(self.family);
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

        match self.socket.local_addr() {
            Ok(addr) => info!(family = %self.family, addr = %addr, "Listening"),
            Err(_) => info!(family = %self.family, "Listening"),
        }

        while !shutdown.is_cancelled() {
            let received = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = tokio::time::timeout(ctx.poll_interval, self.socket.recv_from(&mut buf)) => result,
            };

            let (len, client) = match received {
                Err(_) => continue, // poll interval elapsed
                Ok(Err(e)) => {
                    if e.kind() != io::ErrorKind::Interrupted {
                        warn!(family = %self.family, error = %e, "UDP recv error");
                    }
                    continue;
                }
                Ok(Ok(r)) => r,
            };

            self.handle_query(&buf[..len], client, &ctx, &logger).await;
        }

        info!(family = %self.family, "Listener stopped");
    }

    async fn handle_query(
        &self,
        packet: &[u8],
        client: SocketAddr,
        ctx: &ProxyContext,
        logger: &QueryLogger,
    ) {
        let start_time = Instant::now();
        let classification = ctx.resolver.classify(packet);
        let domain = classification.domain();

        let response = match classification.verdict.response_code() {
            Some(code) => {
                let response = synthesize_response(packet, code);
                if response.is_some() {
                    logger.answered(domain, client, classification.verdict, code, start_time.elapsed());
                }
                response
            }
            None => {
                let upstream_start = Instant::now();
                match relay(packet, &ctx.upstream, ctx.relay_timeout).await {
                    Ok(reply) => {
                        logger.forwarded(
                            domain,
                            client,
                            start_time.elapsed(),
                            upstream_start.elapsed(),
                            extract_first_address(&reply),
                        );
                        Some(reply)
                    }
                    Err(e) => {
                        logger.server_failure(domain, client, &e);
                        synthesize_response(packet, ResponseCode::ServerFailure)
                    }
                }
            }
        };

        let Some(response) = response else {
            logger.dropped(client, packet.len());
            return;
        };

        if let Err(e) = self.socket.send_to(&response, client).await {
            warn!(family = %self.family, client = %client, error = %e, "UDP response error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_socket_detects_family() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let listener = UdpListener::from_socket(socket).unwrap();

        assert_eq!(listener.family(), AddressFamily::Ipv4);
    }

    #[tokio::test]
    async fn ipv6_listener_can_share_port_with_ipv4() {
        let v4 = UdpListener::bind("0.0.0.0:0".parse().unwrap()).await.unwrap();
        let port = v4.local_addr().unwrap().port();

        // Hosts without IPv6 cannot bind at all; nothing to check there.
        if let Ok(v6) = UdpListener::bind(SocketAddr::from((std::net::Ipv6Addr::LOCALHOST, port))).await {
            assert_eq!(v6.family(), AddressFamily::Ipv6);
            assert_eq!(v6.local_addr().unwrap().port(), port);
        }
    }
}
