use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dnsfence::ProxyError;
use dnsfence::filter;
use dnsfence::proxy::{self, DEFAULT_POLL_INTERVAL, ProxyConfig};
use dnsfence::transport::upstream::UpstreamTarget;

#[derive(Parser)]
#[command(name = "dnsfence")]
#[command(about = "DNS forwarding proxy that refuses blocklisted domains", long_about = None)]
struct Args {
    /// Upstream DNS server (hostname or IP address), contacted on port 53
    #[arg(short, long)]
    server: String,

    /// Local port to listen on
    #[arg(short, long, default_value_t = 53, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// File with blocked domains, one per line
    #[arg(short, long)]
    filter_file: PathBuf,

    /// Log every query
    #[arg(short, long)]
    verbose: bool,

    /// Upstream reply timeout in milliseconds
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,

    /// IPv4 bind address
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind4: Ipv4Addr,

    /// IPv6 bind address
    #[arg(long, default_value_t = Ipv6Addr::UNSPECIFIED)]
    bind6: Ipv6Addr,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn run(args: Args) -> Result<(), ProxyError> {
    let upstream = UpstreamTarget::resolve(&args.server)
        .await
        .map_err(|source| ProxyError::UpstreamResolve {
            host: args.server.clone(),
            source,
        })?;
    if upstream.is_empty() {
        return Err(ProxyError::UpstreamUnavailable(args.server));
    }

    let blocklist = filter::load_file(&args.filter_file)?.blocklist;

    let config = ProxyConfig {
        listen_v4: Some(SocketAddr::from((args.bind4, args.port))),
        listen_v6: Some(SocketAddr::from((args.bind6, args.port))),
        upstream,
        relay_timeout: Duration::from_millis(args.timeout_ms),
        poll_interval: DEFAULT_POLL_INTERVAL,
    };
    info!(server = %args.server, resolved = %upstream, port = args.port, "Configuration loaded");

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    proxy::run(config, blocklist, shutdown).await
}

/// Cancel `shutdown` on SIGINT or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    wait_for_signal().await;
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "Cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Cannot start runtime");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Proxy failed");
            ExitCode::FAILURE
        }
    }
}
