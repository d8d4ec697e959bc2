//! Session setup validation
//!
//! Runs a list of checks over a profile and the issues collected while a
//! session was set up, and renders the outcome as a table.
//!
//! # Example
//!
//! ```no_run
//! use stream_multiplayer::config::SessionConfig;
//! use stream_multiplayer::validation::{ValidationRunner, checks::*};
//!
//! let config = SessionConfig::load("debug").unwrap_or_default();
//! let report = ValidationRunner::new()
//!     .add_check(PlayersCheck::new(&config))
//!     .add_check(DisplaysCheck::new(&config))
//!     .run();
//!
//! std::process::exit(report.exit_code());
//! ```

pub mod check;
pub mod checks;
pub mod reporter;
pub mod runner;

pub use check::{CheckResult, CheckStatus, ValidationCheck};
pub use reporter::{format_report, print_report};
pub use runner::{ValidationReport, ValidationRunner};

use crate::config::SessionConfig;
use crate::raycast::SetupReport;

/// Runs the standard checks for a profile and its setup report
pub fn validate_session(config: &SessionConfig, setup: &SetupReport) -> ValidationReport {
    ValidationRunner::new()
        .add_check(checks::PlayersCheck::new(config))
        .add_check(checks::DisplaysCheck::new(config))
        .add_check(checks::TemplatesCheck::new(config))
        .add_check(checks::RaycasterCheck::new(setup))
        .run()
}
