use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn relay() -> Command {
    let mut cmd = Command::cargo_bin("relay").unwrap();
    // keep the developer's environment out of config discovery
    cmd.env_remove("OPENAI_API_KEY")
        .env_remove("AZURE_OPENAI_API_KEY")
        .env_remove("RELAY_CONFIG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    relay()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("decode"))
        .stdout(predicate::str::contains("--max-rounds"));
}

#[test]
fn tools_lists_builtin_tools_without_configuration() {
    relay()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("get_weather"))
        .stdout(predicate::str::contains("check_calendar"))
        .stdout(predicate::str::contains("set_reminder"))
        .stdout(predicate::str::contains("get_datetime"));
}

#[test]
fn query_fails_cleanly_on_broken_config() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, "{ not json").unwrap();

    relay()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("What's the weather in London?")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn unknown_protocol_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(
        &config,
        r#"{"protocol": "carrier_pigeon", "api_key": "k", "model": "m"}"#,
    )
    .unwrap();

    relay()
        .arg("--config")
        .arg(&config)
        .arg("hello")
        .assert()
        .failure();
}
