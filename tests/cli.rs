//! CLI integration tests

mod common;

use common::{cli, TestEnvironment};
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("freedesktop notification daemon"));
}

#[test]
fn test_cli_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("popup-notifier"));
}

#[test]
fn test_config_init_creates_project_config() {
    let env = TestEnvironment::new();
    env.command().args(["config", "init"]).assert().success();

    assert!(env.config_path().exists());
    assert!(env.events_dir().is_dir());
}

#[test]
fn test_config_show_prints_toml() {
    let env = TestEnvironment::new();
    env.command().args(["config", "init"]).assert().success();

    env.command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("call_timeout_ms = 25000"));
}

#[test]
fn test_send_dry_run_prints_notify_call() {
    let env = TestEnvironment::new();
    env.command().args(["config", "init"]).assert().success();

    env.command()
        .args([
            "send",
            "Build <b>finished</b>",
            "--title",
            "Builder",
            "--default-action",
            "Open",
            "--action",
            "Ignore",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""summary": "Builder""#))
        .stdout(predicate::str::contains("<b>finished</b>"))
        .stdout(predicate::str::contains(r#""default""#))
        .stdout(predicate::str::contains(r#""transient": true"#));
}

#[test]
fn test_send_dry_run_uses_events_file() {
    let env = TestEnvironment::new();
    env.command().args(["config", "init"]).assert().success();
    env.write_events(
        "builder",
        "[global]\nname = \"Builder Pro\"\n\n[events.failed]\nurgency = \"critical\"\n",
    );

    env.command()
        .args(["send", "oops", "--app", "builder", "--event", "failed", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""app_name": "Builder Pro""#))
        .stdout(predicate::str::contains(r#""urgency": 2"#));
}

#[test]
fn test_send_rejects_unknown_urgency() {
    cli()
        .args(["send", "x", "--urgency", "urgent", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown urgency"));
}
