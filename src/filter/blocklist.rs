//! Set of blocked domains.
//!
//! Each entry blocks itself and every name below it. Built once at startup
//! and shared read-only by all listeners.

use rustc_hash::FxHashSet;

/// A set of blocked domains for efficient lookup.
#[derive(Debug, Default, Clone)]
pub struct Blocklist {
    domains: FxHashSet<String>,
}

impl Blocklist {
    /// Create an empty blocklist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a normalized rule (lowercase, no leading or trailing dot).
    pub fn insert(&mut self, domain: impl Into<String>) -> bool {
        self.domains.insert(domain.into())
    }

    /// Check if a domain should be blocked.
    ///
    /// Matches the domain itself and every parent at a label boundary, so
    /// "example.com" blocks "ads.example.com" but not "notexample.com".
    pub fn is_blocked(&self, domain: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }

        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        let mut current = domain.as_str();

        loop {
            if self.domains.contains(current) {
                return true;
            }
            match current.find('.') {
                Some(pos) => current = &current[pos + 1..],
                None => return false,
            }
        }
    }

    /// Returns the number of domains in the blocklist.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Blocklist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            domains: iter.into_iter().map(Into::into).collect(),
        }
    }
}
