//! Core validation check trait and types

use std::time::Duration;

use colored::Colorize;

/// Outcome of one validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Usable, but something was mitigated or looks wrong
    Warn,
    Fail,
}

impl CheckStatus {
    /// Pass or Warn
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Pass | CheckStatus::Warn)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail)
    }

    pub fn as_colored_str(&self) -> String {
        match self {
            CheckStatus::Pass => "PASS".green().to_string(),
            CheckStatus::Warn => "WARN".yellow().to_string(),
            CheckStatus::Fail => "FAIL".red().to_string(),
        }
    }
}

/// Result of one validation check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub status: CheckStatus,
    /// One-line summary
    pub message: String,
    /// Optional multi-line detail, printed below the table
    pub details: Option<String>,
    pub duration: Duration,
}

impl CheckResult {
    fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            duration: Duration::ZERO,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Pass, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Warn, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, message)
    }

    /// Attaches details; empty details are ignored
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        let details = details.into();
        if !details.is_empty() {
            self.details = Some(details);
        }
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// A setup validation step
pub trait ValidationCheck {
    /// Name shown in the report
    fn name(&self) -> &'static str;

    fn check(&self) -> CheckResult;

    fn description(&self) -> Option<&'static str> {
        None
    }
}
