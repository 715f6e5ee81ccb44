//! DNS query filtering module.
//!
//! Holds the blocklist consulted for every query and the parser that
//! builds it from a rules file.

mod blocklist;
mod loader;

pub use blocklist::Blocklist;
pub use loader::{FilterError, LoadReport, RuleRejection, RuleWarning, load_file, parse_rules};
