//! Setup checks for players, displays, action templates and raycasters

use itertools::Itertools;

use super::check::{CheckResult, ValidationCheck};
use crate::build_info;
use crate::config::SessionConfig;
use crate::raycast::{SetupReport, Severity};

/// At least one player is configured
pub struct PlayersCheck {
    config: SessionConfig,
}

impl PlayersCheck {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ValidationCheck for PlayersCheck {
    fn name(&self) -> &'static str {
        "Players"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates that the profile configures at least one player")
    }

    fn check(&self) -> CheckResult {
        let players = &self.config.players;
        if players.is_empty() {
            return CheckResult::fail("No players configured");
        }
        let details = players
            .iter()
            .map(|player| {
                format!(
                    "  {} on display {}{}",
                    player.name,
                    player.display,
                    if player.stream_in_editor { " (streamed)" } else { "" }
                )
            })
            .join("\n");
        CheckResult::pass(format!("{} player(s) configured", players.len())).with_details(details)
    }
}

/// Every player renders to its own display
pub struct DisplaysCheck {
    config: SessionConfig,
}

impl DisplaysCheck {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ValidationCheck for DisplaysCheck {
    fn name(&self) -> &'static str {
        "Displays"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates that no two players share a display")
    }

    fn check(&self) -> CheckResult {
        if self.config.has_distinct_displays() {
            return CheckResult::pass("Displays are distinct");
        }
        let mut fixed = self.config.clone();
        let details = fixed
            .assign_distinct_displays()
            .into_iter()
            .map(|(player, from, to)| format!("  {player}: display {from} -> {to}"))
            .join("\n");
        CheckResult::warn("Players share a display; reassigned at session start").with_details(details)
    }
}

/// Player action templates exist and contain actions
pub struct TemplatesCheck {
    config: SessionConfig,
}

impl TemplatesCheck {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ValidationCheck for TemplatesCheck {
    fn name(&self) -> &'static str {
        "Action Templates"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates that every referenced action template is configured")
    }

    fn check(&self) -> CheckResult {
        let mut missing = Vec::new();
        let mut empty = Vec::new();
        for player in &self.config.players {
            let Some(name) = &player.actions else {
                continue;
            };
            match self.config.template(name) {
                None => missing.push(format!("  ✗ {}: template '{name}' not found", player.name)),
                Some(template) if template.maps.iter().all(|map| map.actions.is_empty()) => {
                    empty.push(format!("  ⚠ {}: template '{name}' has no actions", player.name))
                }
                Some(_) => {}
            }
        }

        let details = missing.iter().chain(&empty).join("\n");
        if !missing.is_empty() {
            CheckResult::fail(format!("{} missing template(s)", missing.len())).with_details(details)
        } else if !empty.is_empty() {
            CheckResult::warn("Templates without actions").with_details(details)
        } else {
            CheckResult::pass(format!("{} template(s) configured", self.config.action_templates.len()))
        }
    }
}

/// Raycaster replacement and ownership found during setup
pub struct RaycasterCheck {
    report: SetupReport,
}

impl RaycasterCheck {
    pub fn new(report: &SetupReport) -> Self {
        Self {
            report: report.clone(),
        }
    }
}

impl ValidationCheck for RaycasterCheck {
    fn name(&self) -> &'static str {
        "Setup"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Reports issues found while installing per-user raycasters and devices")
    }

    fn check(&self) -> CheckResult {
        let details = self
            .report
            .issues()
            .iter()
            .map(|issue| format!("  [{}] {}", issue.severity, issue.message))
            .join("\n");
        let count = self.report.issues().len();
        let result = match self.report.worst() {
            None => CheckResult::pass("No setup issues"),
            Some(Severity::Info) => CheckResult::pass(format!("{count} automatic fix(es) applied")),
            Some(Severity::Warning) => CheckResult::warn(format!("{count} setup issue(s)")),
            Some(Severity::Error) => CheckResult::fail(format!("{count} setup issue(s)")),
        };
        result.with_details(details)
    }
}

/// Profiles load from files and environment
pub struct ConfigCheck {
    profiles: Vec<&'static str>,
}

impl ConfigCheck {
    pub fn new() -> Self {
        Self {
            profiles: vec!["debug", "release"],
        }
    }

    pub fn with_profiles(profiles: Vec<&'static str>) -> Self {
        Self { profiles }
    }
}

impl Default for ConfigCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationCheck for ConfigCheck {
    fn name(&self) -> &'static str {
        "Configuration"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates configuration loading from files and environment")
    }

    fn check(&self) -> CheckResult {
        let mut details = Vec::new();
        let mut failed = false;

        for profile in &self.profiles {
            match SessionConfig::load(profile) {
                Ok(config) => details.push(format!(
                    "  ✓ Profile '{profile}': {} player(s), {} template(s)",
                    config.players.len(),
                    config.action_templates.len()
                )),
                Err(e) => {
                    details.push(format!("  ✗ Profile '{profile}': failed to load - {e}"));
                    failed = true;
                }
            }
        }

        let details = details.join("\n");
        if failed {
            CheckResult::fail("Failed to load one or more config profiles").with_details(details)
        } else {
            CheckResult::pass(format!("{} profiles validated", self.profiles.len())).with_details(details)
        }
    }
}

/// Build metadata is available
#[derive(Default)]
pub struct BuildInfoCheck;

impl BuildInfoCheck {
    pub fn new() -> Self {
        Self
    }
}

impl ValidationCheck for BuildInfoCheck {
    fn name(&self) -> &'static str {
        "Build Info"
    }

    fn check(&self) -> CheckResult {
        CheckResult::pass("Build metadata accessible").with_details(build_info::detailed_info())
    }
}
