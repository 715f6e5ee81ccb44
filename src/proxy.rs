//! DNS proxy orchestration.
//!
//! Binds one listener per address family and runs them until shutdown.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::ProxyError;
use crate::filter::Blocklist;
use crate::resolver::Resolver;
use crate::transport::udp::UdpListener;
use crate::transport::upstream::UpstreamTarget;

pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration for the DNS proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// IPv4 listen address; `None` disables the IPv4 listener.
    pub listen_v4: Option<SocketAddr>,
    /// IPv6 listen address; `None` disables the IPv6 listener.
    pub listen_v6: Option<SocketAddr>,
    pub upstream: UpstreamTarget,
    pub relay_timeout: Duration,
    pub poll_interval: Duration,
}

impl ProxyConfig {
    /// Listen on all interfaces of both families on `port`.
    pub fn new(port: u16, upstream: UpstreamTarget) -> Self {
        Self {
            listen_v4: Some((Ipv4Addr::UNSPECIFIED, port).into()),
            listen_v6: Some((Ipv6Addr::UNSPECIFIED, port).into()),
            upstream,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Read-only state shared by every listener.
pub struct ProxyContext {
    pub resolver: Resolver,
    pub upstream: UpstreamTarget,
    pub relay_timeout: Duration,
    pub poll_interval: Duration,
}

impl ProxyContext {
    pub fn new(config: &ProxyConfig, blocklist: Blocklist) -> Self {
        Self {
            resolver: Resolver::new(blocklist),
            upstream: config.upstream,
            relay_timeout: config.relay_timeout,
            poll_interval: config.poll_interval,
        }
    }
}

/// Bind every configured listener.
///
/// A family that fails to bind is skipped with a warning; it is an error
/// only if no listener could be bound at all.
pub async fn bind_listeners(config: &ProxyConfig) -> Result<Vec<UdpListener>, ProxyError> {
    let mut listeners = Vec::with_capacity(2);

    for addr in [config.listen_v4, config.listen_v6].into_iter().flatten() {
        match UdpListener::bind(addr).await {
            Ok(listener) => listeners.push(listener),
            Err(e) => warn!(addr = %addr, error = %e, "Cannot bind listener, skipping"),
        }
    }

    if listeners.is_empty() {
        return Err(ProxyError::NoListener);
    }

    Ok(listeners)
}

/// Run every listener to completion.
pub async fn serve(
    listeners: Vec<UdpListener>,
    ctx: Arc<ProxyContext>,
    shutdown: CancellationToken,
) {
    let handles = listeners
        .into_iter()
        .map(|listener| listener.start(ctx.clone(), shutdown.clone()));

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!(error = %e, "Listener task failed");
        }
    }
}

/// Run the DNS proxy with the given configuration until `shutdown` fires.
pub async fn run(
    config: ProxyConfig,
    blocklist: Blocklist,
    shutdown: CancellationToken,
) -> Result<(), ProxyError> {
    let listeners = bind_listeners(&config).await?;
    let ctx = Arc::new(ProxyContext::new(&config, blocklist));

    info!(
        listeners = listeners.len(),
        blocked_domains = ctx.resolver.blocked_count(),
        upstream = %config.upstream,
        relay_timeout_ms = config.relay_timeout.as_millis() as u64,
        "DNS proxy started"
    );

    serve(listeners, ctx, shutdown).await;

    info!("DNS proxy terminated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_config() -> ProxyConfig {
        ProxyConfig {
            listen_v4: Some("127.0.0.1:0".parse().unwrap()),
            listen_v6: None,
            upstream: UpstreamTarget::default(),
            relay_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(20),
        }
    }

    #[test]
    fn new_config_uses_defaults() {
        let config = ProxyConfig::new(5300, UpstreamTarget::default());

        assert_eq!(config.listen_v4, Some("0.0.0.0:5300".parse().unwrap()));
        assert_eq!(config.listen_v6, Some("[::]:5300".parse().unwrap()));
        assert_eq!(config.relay_timeout, Duration::from_secs(3));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn bind_listeners_skips_failed_family() {
        let taken = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = loopback_config();
        config.listen_v6 = config.listen_v4;
        config.listen_v4 = Some(taken.local_addr().unwrap());

        let listeners = bind_listeners(&config).await.unwrap();

        assert_eq!(listeners.len(), 1);
    }

    #[tokio::test]
    async fn bind_listeners_fails_when_nothing_binds() {
        let taken = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut config = loopback_config();
        config.listen_v4 = Some(taken.local_addr().unwrap());

        let result = bind_listeners(&config).await;

        assert!(matches!(result, Err(ProxyError::NoListener)));
    }

    #[tokio::test]
    async fn run_returns_after_shutdown() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = run(loopback_config(), Blocklist::new(), shutdown).await;

        assert!(result.is_ok());
    }
}
