//! DNS query classification.
//!
//! Decides what happens to each query before any I/O:
//! 1. Decode (malformed messages get FORMERR)
//! 2. Reject multi-question messages (NOTIMP)
//! 3. Filter against the blocklist (REFUSED)
//! 4. Reject anything but IN/A (NOTIMP)
//! 5. Otherwise forward upstream
//!
//! Transports handle the actual I/O, resolver handles decisions.

use std::fmt;

use crate::dns::{DecodeError, ParsedQuery, QueryClass, QueryType, ResponseCode};
use crate::filter::Blocklist;

/// Outcome class for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Malformed,
    Blocked,
    Unsupported,
    Forward,
}

impl Verdict {
    /// Response code to synthesize locally, or `None` when the query goes
    /// upstream.
    pub fn response_code(self) -> Option<ResponseCode> {
        match self {
            Verdict::Malformed => Some(ResponseCode::FormatError),
            Verdict::Blocked => Some(ResponseCode::Refused),
            Verdict::Unsupported => Some(ResponseCode::NotImplemented),
            Verdict::Forward => None,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Malformed => "malformed",
            Verdict::Blocked => "blocked",
            Verdict::Unsupported => "unsupported",
            Verdict::Forward => "forward",
        };
        f.write_str(s)
    }
}

/// Result of classifying one packet.
#[derive(Debug)]
pub struct Classification {
    pub verdict: Verdict,
    /// The decoded query, when decoding succeeded.
    pub query: Option<ParsedQuery>,
    /// Why decoding failed, for `Verdict::Malformed`.
    pub error: Option<DecodeError>,
}

impl Classification {
    /// True if the question name matched the blocklist.
    pub fn blocked(&self) -> bool {
        self.verdict == Verdict::Blocked
    }

    /// Question name for logging, or a placeholder.
    pub fn domain(&self) -> &str {
        self.query
            .as_ref()
            .and_then(ParsedQuery::name)
            .unwrap_or("<unknown>")
    }
}

/// Resolver handles DNS query processing decisions.
///
/// Shared read-only by every listener; classification never mutates it.
pub struct Resolver {
    blocklist: Blocklist,
}

impl Resolver {
    /// Create a new resolver with the given blocklist.
    pub fn new(blocklist: Blocklist) -> Self {
        Self { blocklist }
    }

    /// Classify a raw client packet.
    pub fn classify(&self, packet: &[u8]) -> Classification {
        let query = match ParsedQuery::decode(packet) {
            Ok(query) => query,
            Err(error) => {
                return Classification {
                    verdict: Verdict::Malformed,
                    query: None,
                    error: Some(error),
                };
            }
        };

        let verdict = match &query.question {
            None => Verdict::Unsupported,
            Some(question) if self.blocklist.is_blocked(&question.normalized) => Verdict::Blocked,
            Some(question)
                if question.qclass != QueryClass::IN || question.qtype != QueryType::A =>
            {
                Verdict::Unsupported
            }
            Some(_) => Verdict::Forward,
        };

        Classification {
            verdict,
            query: Some(query),
            error: None,
        }
    }

    /// Returns the number of domains in the blocklist.
    pub fn blocked_count(&self) -> usize {
        self.blocklist.len()
    }
}
