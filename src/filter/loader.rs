//! Blocklist file parsing.
//!
//! One rule per line. Comments start with `#`. A rule may be written as a
//! bare domain or as a URL; the scheme, a leading `www.`, and anything from
//! the first `/`, `?` or `#` on are dropped. Wildcards and names that are
//! not valid RFC 1035 hostnames are skipped with a warning.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::Blocklist;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("cannot read filter file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a line was not turned into a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleRejection {
    #[error("wildcards are not allowed")]
    Wildcard,
    #[error("invalid domain format")]
    InvalidDomain,
}

/// A skipped line, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub line: usize,
    pub text: String,
    pub reason: RuleRejection,
}

/// Outcome of parsing a blocklist source.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub blocklist: Blocklist,
    pub warnings: Vec<RuleWarning>,
}

/// Read and parse a blocklist file.
pub fn load_file(path: &Path) -> Result<LoadReport, FilterError> {
    let text = fs::read_to_string(path).map_err(|source| FilterError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let report = parse_rules(&text);
    info!(
        path = %path.display(),
        rules = report.blocklist.len(),
        skipped = report.warnings.len(),
        "Loaded filter rules"
    );

    Ok(report)
}

/// Parse blocklist text into a [`Blocklist`], collecting rejected lines.
pub fn parse_rules(text: &str) -> LoadReport {
    let mut report = LoadReport::default();

    for (index, line) in text.lines().enumerate() {
        let domain = normalize_rule(line);
        if domain.is_empty() {
            continue;
        }

        let rejection = if domain.contains('*') {
            Some(RuleRejection::Wildcard)
        } else if !is_valid_domain(&domain) {
            Some(RuleRejection::InvalidDomain)
        } else {
            None
        };

        match rejection {
            Some(reason) => {
                warn!(line = index + 1, rule = %line.trim(), "Skipping filter rule: {}", reason);
                report.warnings.push(RuleWarning {
                    line: index + 1,
                    text: line.to_string(),
                    reason,
                });
            }
            None => {
                report.blocklist.insert(domain);
            }
        }
    }

    report
}

/// Reduce a rule line to a lowercase domain, or an empty string if the line
/// holds no rule.
fn normalize_rule(line: &str) -> String {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.trim().to_ascii_lowercase();

    let mut rule = line.as_str();
    for scheme in ["http://", "https://"] {
        if let Some(rest) = rule.strip_prefix(scheme) {
            rule = rest;
            break;
        }
    }
    rule = rule.strip_prefix("www.").unwrap_or(rule);
    if let Some(pos) = rule.find(['/', '?', '#']) {
        rule = &rule[..pos];
    }

    rule.trim_end_matches('.').to_string()
}

fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty() && domain.len() <= MAX_DOMAIN_LEN && domain.split('.').all(is_valid_label)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= MAX_LABEL_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rules_accepts_valid_domains() {
        let text = "example.com\nwww.google.com\nsub.domain.org\ntest123.net\nfoo-bar.com\n";

        let report = parse_rules(text);

        assert_eq!(report.blocklist.len(), 5);
        assert!(report.warnings.is_empty());
        assert!(report.blocklist.is_blocked("google.com"));
    }

    #[test]
    fn parse_rules_skips_comments_and_blank_lines() {
        let text = "# header\n\n   \nexample.com  # trailing note\n";

        let report = parse_rules(text);

        assert_eq!(report.blocklist.len(), 1);
        assert!(report.blocklist.is_blocked("example.com"));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn parse_rules_strips_urls() {
        let text = "https://www.Ads.Example.com/banner?id=1\nhttp://tracker.net#frag\nvalid-domain.org/path?query\n";

        let report = parse_rules(text);

        assert!(report.blocklist.is_blocked("ads.example.com"));
        assert!(report.blocklist.is_blocked("tracker.net"));
        assert!(report.blocklist.is_blocked("valid-domain.org"));
        assert_eq!(report.blocklist.len(), 3);
    }

    #[test]
    fn parse_rules_reports_malformed_lines() {
        let long = format!("{}.com", "a".repeat(300));
        let text = format!(
            "http://invalid..com\nwww.!invalid.com\n*wildcard.com\nvalid.com\n{}\n-dash.com\n",
            long
        );

        let report = parse_rules(&text);

        assert_eq!(report.blocklist.len(), 1);
        assert!(report.blocklist.is_blocked("valid.com"));
        let lines: Vec<_> = report.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![1, 2, 3, 5, 6]);
        assert_eq!(report.warnings[2].reason, RuleRejection::Wildcard);
        assert_eq!(report.warnings[0].reason, RuleRejection::InvalidDomain);
    }

    #[test]
    fn label_length_limit() {
        assert!(is_valid_domain(&format!("{}.com", "a".repeat(63))));
        assert!(!is_valid_domain(&format!("{}.com", "a".repeat(64))));
    }

    #[test]
    fn trailing_dot_is_dropped() {
        let report = parse_rules("example.com.\n");

        assert!(report.blocklist.is_blocked("www.example.com"));
    }

    #[test]
    fn load_file_reports_missing_file() {
        let result = load_file(Path::new("/nonexistent/dnsfence/filters.txt"));

        assert!(matches!(result, Err(FilterError::Io { .. })));
    }

    #[test]
    fn load_file_reads_rules() {
        let path = std::env::temp_dir().join(format!("dnsfence-filter-{}.txt", std::process::id()));
        fs::write(&path, "example.com\nblocked.org\n").unwrap();

        let report = load_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(report.blocklist.len(), 2);
        assert!(report.blocklist.is_blocked("www.blocked.org"));
    }
}
