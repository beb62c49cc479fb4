//! Runs the binary against a recorded session

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;

/// A two-stop session; `commands` run before the first render.
fn session(dir: &Path, commands: &[&str]) -> PathBuf
{
    let session = json!({
        "architecture": "x86_64",
        "register_sets": [
            { "name": "General Purpose Registers",
              "registers": [ { "name": "rax", "bits": 64 }, { "name": "rip", "bits": 64 }, { "name": "eflags", "bits": 32 } ] }
        ],
        "symbols": [
            { "name": "main", "start": "0x401000",
              "instructions": [
                  { "length": 1, "mnemonic": "push", "operands": "rbp" },
                  { "length": 2, "mnemonic": "je", "operands": "0x401010" },
                  { "length": 1, "mnemonic": "ret" }
              ] }
        ],
        "stops": [
            { "pc": "0x401000", "frame": "0x7ffe0000", "registers": { "rax": "0x1", "eflags": "0x246" },
              "commands": commands },
            { "pc": "0x401001", "frame": "0x7ffe0000", "registers": { "rax": "0x2" } }
        ]
    });
    let path = dir.join("session.json");
    fs::write(&path, session.to_string()).unwrap();
    path
}

fn vantage(home: &Path) -> Command
{
    let mut command = Command::new(env!("CARGO_BIN_EXE_vantage"));
    command.env("HOME", home).env_remove("RUST_LOG");
    command
}

#[test]
fn test_replay_renders_every_stop()
{
    let dir = tempfile::tempdir().unwrap();
    let session = session(
        dir.path(),
        &["dashboard registers -disable", "dashboard assembly instructions-after"],
    );

    let output = vantage(dir.path())
        .args(["replay", session.to_str().unwrap(), "--dump-config"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Assembly").count(), 2);
    assert!(!stdout.contains("Registers"));
    assert!(stdout.contains("assembly instructions-after = 6"));
    assert!(stdout.contains("[taken]"));
    assert_eq!(stdout.matches("\"enabled\": false").count(), 1);
}

#[test]
fn test_replay_applies_config_file()
{
    let dir = tempfile::tempdir().unwrap();
    let session = session(dir.path(), &[]);
    let config = dir.path().join("dashboard.json");
    fs::write(&config, r#"{ "enabled": true, "modules": { "assembly": { "enabled": false } } }"#).unwrap();

    let output = vantage(dir.path())
        .args(["replay", session.to_str().unwrap(), "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Assembly"));
    assert_eq!(stdout.matches("Registers").count(), 2);
}

#[test]
fn test_missing_session_fails()
{
    let dir = tempfile::tempdir().unwrap();
    let output = vantage(dir.path())
        .args(["replay", dir.path().join("absent.json").to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Error:"));
}

#[test]
fn test_config_prints_defaults()
{
    let dir = tempfile::tempdir().unwrap();
    let output = vantage(dir.path()).arg("config").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let config: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(config["settings"]["layout"], "registers assembly");
    assert_eq!(config["modules"]["assembly"]["settings"]["instructions-before"], 6);
    assert_eq!(config["modules"]["registers"]["settings"]["show-vector"], false);
}
