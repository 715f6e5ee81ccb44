//! Errors that stop the proxy from starting.
//!
//! Per-query failures never surface here; listeners turn them into DNS
//! response codes.

use std::io;

use thiserror::Error;

use crate::filter::FilterError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no listener could be bound")]
    NoListener,
    #[error("cannot resolve upstream server '{host}': {source}")]
    UpstreamResolve {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("upstream server '{0}' has no IPv4 or IPv6 address")]
    UpstreamUnavailable(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
}
