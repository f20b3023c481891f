//! CLI integration tests for svws-rollover.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that occur before any database
//! connection is attempted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the svws-rollover binary.
fn cmd() -> Command {
    Command::cargo_bin("svws-rollover").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list-steps"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--steps"))
        .stdout(predicate::str::contains("--verify"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("svws-rollover"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_from_env_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--from-env"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Step Listing and Selection
// =============================================================================

#[test]
fn test_list_steps_prints_catalog_in_order() {
    cmd()
        .arg("list-steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("schuljahresabschnitte"))
        .stdout(predicate::str::contains("schueler_dates"))
        .stdout(predicate::str::contains("schueler_abschlussdatum"))
        .stdout(predicate::str::contains("schueler_allgadr"))
        .stdout(predicate::str::is_match("(?s)schuljahresabschnitte.*schueler_dates.*schueler_allgadr").unwrap());
}

#[test]
fn test_list_steps_json() {
    cmd()
        .args(["--output-json", "list-steps"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"key\": \"schueler_jahre\""))
        .stdout(predicate::str::contains("\"transform\": \"integer_year_add_year\""));
}

#[test]
fn test_unknown_step_exits_with_code_3() {
    // Resolved before the config is loaded, so the missing file does not matter
    cmd()
        .args([
            "--config",
            "nonexistent_config_file.json",
            "run",
            "--steps",
            "schueler_dates,lehrer_dates",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Unknown step(s): lehrer_dates"));
}

#[test]
fn test_empty_step_list_is_rejected() {
    // Resolved before the config is loaded, so nothing connects or commits
    for steps in [",", " , ,"] {
        cmd()
            .args(["--config", "nonexistent_config_file.json", "run", "--steps", steps])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No steps selected"));
    }
}

#[test]
fn test_blank_step_argument_fails() {
    cmd()
        .args(["--config", "nonexistent_config_file.json", "run", "--steps", ""])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Rollover committed").not());
}

#[test]
fn test_verify_requires_dry_run() {
    cmd()
        .args(["run", "--verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dry-run"));
}

// =============================================================================
// Exit Code Tests - Config Errors
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.json", "health-check"])
        .assert()
        .code(7); // EXIT_IO_ERROR - file not found
}

#[test]
fn test_invalid_yaml_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1); // EXIT_CONFIG_ERROR
}

#[test]
fn test_empty_config_exits_with_code_1() {
    let file = tempfile::NamedTempFile::new().unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run", "--dry-run"])
        .assert()
        .code(1); // EXIT_CONFIG_ERROR
}

#[test]
fn test_invalid_settings_exit_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"database": {{"host": "", "user": "svws", "database": "SVWS"}}}}"#
    )
    .unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("host"));
}

#[test]
fn test_from_env_missing_variables_exits_with_code_1() {
    cmd()
        .args(["--from-env", "health-check"])
        .env_remove("MARIADB_HOST")
        .env_remove("MARIADB_USER")
        .env_remove("MARIADB_PASSWORD")
        .env_remove("MARIADB_DATABASE")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MARIADB_HOST"));
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test the database connection"));
}

// =============================================================================
// Config Path Tests
// =============================================================================

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.json]"));
}

#[test]
fn test_short_config_flag() {
    // -c should work as short for --config
    cmd()
        .args(["-c", "some_config.json", "--help"])
        .assert()
        .success();
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
