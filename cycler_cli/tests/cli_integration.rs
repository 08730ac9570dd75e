use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn shipped_config() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../etc/cycler.toml")
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("cycler")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle"))
        .stdout(predicate::str::contains("self-check"));
}

#[test]
fn self_check_against_the_simulated_supply() {
    Command::cargo_bin("cycler")
        .expect("binary")
        .args(["--config", shipped_config(), "self-check", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SIMULATED"));
}

#[test]
fn self_check_emits_json_when_asked() {
    Command::cargo_bin("cycler")
        .expect("binary")
        .args(["--config", shipped_config(), "--json", "self-check", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\":true"));
}

#[test]
fn missing_config_fails_with_context() {
    Command::cargo_bin("cycler")
        .expect("binary")
        .args(["--config", "/nonexistent/cycler.toml", "self-check", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn invalid_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        "[cell]\ncapacity_ah = -1.0\nv_max = 1.7\n"
    )
    .expect("write config");
    Command::cargo_bin("cycler")
        .expect("binary")
        .args([
            "--config",
            file.path().to_str().expect("utf8 path"),
            "self-check",
            "--simulate",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("capacity_ah"));
}
