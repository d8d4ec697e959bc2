//! Integration tests for profile loading and setup validation

use std::fs;

use stream_multiplayer::config::{PlayerConfig, SessionConfig};
use stream_multiplayer::raycast::{SetupReport, Severity};
use stream_multiplayer::validation::{
    self, CheckStatus, ValidationCheck, ValidationRunner, checks::*, format_report,
};

#[test]
fn test_shipped_profiles_load() {
    let result = ConfigCheck::new().check();
    assert!(
        result.status.is_ok(),
        "Config check failed: {}",
        result.message
    );
}

#[test]
fn test_build_info_check() {
    let result = BuildInfoCheck::new().check();
    assert_eq!(result.status, CheckStatus::Pass);
    assert!(result.details.is_some());
}

#[test]
fn test_debug_profile_is_valid() {
    let config = SessionConfig::load("debug").expect("debug profile loads");
    assert_eq!(config.players.len(), 2);
    assert!(config.template("Gameplay").is_some());

    let report = validation::validate_session(&config, &SetupReport::new());
    if !report.is_valid() {
        eprintln!("\n{}", format_report(&report));
    }
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn test_profile_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("lan.toml"),
        r#"
[simulation]
enabled = false

[[players]]
name = "Left"
display = 2

[[players]]
name = "Right"
display = 2
stream_in_editor = true
"#,
    )
    .unwrap();

    let config = SessionConfig::load_from(dir.path(), "lan").unwrap();
    assert_eq!(config.profile, "lan");
    assert_eq!(config.log_filter, "info");
    assert!(!config.simulation.enabled);
    assert_eq!(config.simulation.connect_delay_frames, 1);
    assert!(config.players[1].stream_in_editor);
    assert!(!config.has_distinct_displays());
}

#[test]
fn test_missing_profile_file_yields_empty_profile() {
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig::load_from(dir.path(), "nowhere").unwrap();
    assert_eq!(config.profile, "nowhere");
    assert!(config.players.is_empty());

    let report = validation::validate_session(&config, &SetupReport::new());
    assert!(!report.is_valid());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.result("Players").unwrap().status, CheckStatus::Fail);
}

#[test]
fn test_shared_display_warns() {
    let mut config = SessionConfig::builtin("test");
    config.players.push(PlayerConfig::new("Player 2", 0));

    let report = validation::validate_session(&config, &SetupReport::new());
    assert!(report.is_valid());
    assert!(report.has_warnings());
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn test_setup_errors_invalidate() {
    let mut setup = SetupReport::new();
    setup.push(Severity::Warning, "duplicate raycaster removed");
    setup.push(Severity::Error, "raycaster replaced with several players");

    let report = ValidationRunner::new().add_check(RaycasterCheck::new(&setup)).run();
    assert_eq!(report.failed, 1);
    let details = report.result("Setup").unwrap().details.clone().unwrap();
    assert!(details.contains("duplicate raycaster removed"));
}

#[test]
fn test_report_summary() {
    let report = validation::validate_session(&SessionConfig::builtin("test"), &SetupReport::new());
    let output = format_report(&report);
    assert!(output.contains("Players"));
    assert!(output.contains("Setup: VALID"));
}
