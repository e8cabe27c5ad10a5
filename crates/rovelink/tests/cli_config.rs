#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "rovelink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn rovelink(config: &PathBuf, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rovelink"))
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .expect("rovelink should run")
}

fn show_json(config: &PathBuf) -> serde_json::Value {
    let output = rovelink(config, &["--format", "json", "config", "show"]);
    assert!(output.status.success(), "show failed: {output:?}");
    serde_json::from_slice(&output.stdout).expect("show should print json")
}

#[test]
fn config_show_defaults() {
    let dir = unique_temp_dir("defaults");
    let config = dir.join("rovelink.json");

    let shown = show_json(&config);
    assert_eq!(shown["endpoint"], "-");
    assert_eq!(shown["motor1a"], "12");
    assert_eq!(shown["motor2b"], "15");
    assert_eq!(shown["ssid"], "-");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn config_set_and_clear() {
    let dir = unique_temp_dir("set-clear");
    let config = dir.join("rovelink.json");

    let output = rovelink(&config, &["config", "set-endpoint", "tcp://127.0.0.1:9000"]);
    assert!(output.status.success(), "set-endpoint failed: {output:?}");
    let output = rovelink(&config, &["config", "set-pins", "21", "22", "23", "24"]);
    assert!(output.status.success(), "set-pins failed: {output:?}");
    let output = rovelink(
        &config,
        &["config", "set-wifi", "--ssid", "garage", "--password", "hunter22"],
    );
    assert!(output.status.success(), "set-wifi failed: {output:?}");

    let shown = show_json(&config);
    assert_eq!(shown["endpoint"], "tcp://127.0.0.1:9000");
    assert_eq!(shown["motor1b"], "22");
    assert_eq!(shown["ssid"], "garage");
    assert_eq!(shown["password"], "********");

    let output = rovelink(&config, &["config", "clear", "all"]);
    assert!(output.status.success(), "clear failed: {output:?}");
    let shown = show_json(&config);
    assert_eq!(shown["endpoint"], "-");
    assert_eq!(shown["motor1b"], "13");
    assert_eq!(shown["ssid"], "-");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_endpoint_is_usage_error() {
    let dir = unique_temp_dir("bad-endpoint");
    let config = dir.join("rovelink.json");

    let output = rovelink(&config, &["config", "set-endpoint", "ftp://example.com:21"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!config.exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupt_config_file_is_config_error() {
    let dir = unique_temp_dir("corrupt");
    let config = dir.join("rovelink.json");
    std::fs::write(&config, b"[1, 2").expect("config should be writable");

    let output = rovelink(&config, &["config", "show"]);
    assert_eq!(output.status.code(), Some(20));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let dir = unique_temp_dir("version");
    let output = rovelink(&dir.join("unused.json"), &["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("rovelink {}", env!("CARGO_PKG_VERSION")));

    let _ = std::fs::remove_dir_all(&dir);
}
