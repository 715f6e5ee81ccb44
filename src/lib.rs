//! dnsfence - a DNS forwarding proxy that refuses blocklisted domains.
//!
//! The library exposes the wire codec, blocklist, classifier and transports
//! for the binary, benchmarks and tests.

pub mod dns;
pub mod error;
pub mod filter;
pub mod proxy;
pub mod resolver;
pub mod transport;

pub use error::ProxyError;
