//! Runs validation checks and tallies the results

use std::time::Instant;

use tracing::debug;

use super::check::{CheckResult, CheckStatus, ValidationCheck};

/// Results of a validation run
#[derive(Debug)]
pub struct ValidationReport {
    /// Check results in the order the checks were added
    pub results: Vec<(String, CheckResult)>,
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
}

impl ValidationReport {
    /// No check failed
    pub fn is_valid(&self) -> bool {
        self.failed == 0
    }

    pub fn has_warnings(&self) -> bool {
        self.warned > 0
    }

    /// 0 = all pass, 1 = any fail, 2 = any warn (but no fail)
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.warned > 0 {
            2
        } else {
            0
        }
    }

    pub fn result(&self, name: &str) -> Option<&CheckResult> {
        self.results
            .iter()
            .find(|(check, _)| check == name)
            .map(|(_, result)| result)
    }
}

/// Collects checks and runs them in order
#[derive(Default)]
pub struct ValidationRunner {
    checks: Vec<Box<dyn ValidationCheck>>,
}

impl ValidationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check<C: ValidationCheck + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn run(self) -> ValidationReport {
        let mut results = Vec::new();
        let (mut passed, mut warned, mut failed) = (0, 0, 0);

        for check in self.checks {
            let name = check.name().to_string();
            let start = Instant::now();
            let result = check.check();
            let result = result.with_duration(start.elapsed());

            match result.status {
                CheckStatus::Pass => passed += 1,
                CheckStatus::Warn => warned += 1,
                CheckStatus::Fail => failed += 1,
            }
            debug!(check = %name, status = ?result.status, "Validation check finished");
            results.push((name, result));
        }

        let total = results.len();
        ValidationReport {
            results,
            total,
            passed,
            warned,
            failed,
        }
    }
}
