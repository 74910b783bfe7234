//! Tests for main.rs startup validation (signing secrets, allowed origins)

use std::fs;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

const ACCESS_SECRET: &str = "startup-access-secret-that-is-long-enough";
const REFRESH_SECRET: &str = "startup-refresh-secret-that-is-long-enough";

/// The server binary with a clean environment and an in-memory database.
fn server_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_foodhive"));
    command
        .env_remove("ACCESS_TOKEN_SECRET")
        .env_remove("REFRESH_TOKEN_SECRET")
        .env_remove("APP_ENV")
        .env_remove("ALLOWED_ORIGINS")
        .env_remove("ROTATE_REFRESH_TOKENS")
        .args(["--database", ":memory:", "--port", "0"])
        .stderr(Stdio::piped())
        .stdout(Stdio::piped());
    command
}

// tracing logs to stdout by default
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr)
}

/// Spawn the server and assert it is still running after validation.
fn assert_starts(command: &mut Command) {
    let mut child = command.spawn().expect("Failed to run binary");

    // Give it a moment to start or fail
    std::thread::sleep(Duration::from_millis(500));

    match child.try_wait() {
        Ok(Some(status)) => {
            let output = child.wait_with_output().unwrap();
            panic!(
                "Server exited unexpectedly with status {:?}, output: {}",
                status,
                combined_output(&output)
            );
        }
        Ok(None) => {
            child.kill().ok();
            child.wait().ok();
        }
        Err(e) => {
            panic!("Error checking process status: {}", e);
        }
    }
}

#[test]
fn test_missing_access_secret_exits_with_error() {
    let output = server_command()
        .env("REFRESH_TOKEN_SECRET", REFRESH_SECRET)
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());

    let combined = combined_output(&output);
    assert!(
        combined.contains("ACCESS_TOKEN_SECRET") && combined.contains("required"),
        "Should mention ACCESS_TOKEN_SECRET is required, got: {}",
        combined
    );
}

#[test]
fn test_missing_refresh_secret_exits_with_error() {
    let output = server_command()
        .env("ACCESS_TOKEN_SECRET", ACCESS_SECRET)
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());

    let combined = combined_output(&output);
    assert!(
        combined.contains("REFRESH_TOKEN_SECRET") && combined.contains("required"),
        "Should mention REFRESH_TOKEN_SECRET is required, got: {}",
        combined
    );
}

#[test]
fn test_short_secret_exits_with_error() {
    let output = server_command()
        .env("ACCESS_TOKEN_SECRET", "too-short")
        .env("REFRESH_TOKEN_SECRET", REFRESH_SECRET)
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());

    let combined = combined_output(&output);
    assert!(
        combined.contains("shorter than"),
        "Should reject the short secret, got: {}",
        combined
    );
}

#[test]
fn test_identical_secrets_exit_with_error() {
    let output = server_command()
        .env("ACCESS_TOKEN_SECRET", ACCESS_SECRET)
        .env("REFRESH_TOKEN_SECRET", ACCESS_SECRET)
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());

    let combined = combined_output(&output);
    assert!(
        combined.contains("must be different"),
        "Should reject identical secrets, got: {}",
        combined
    );
}

#[test]
fn test_http_origin_in_production_exits_with_error() {
    let output = server_command()
        .env("ACCESS_TOKEN_SECRET", ACCESS_SECRET)
        .env("REFRESH_TOKEN_SECRET", REFRESH_SECRET)
        .args([
            "--environment",
            "production",
            "--allowed-origin",
            "http://foodhive.example.com",
        ])
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success());

    let combined = combined_output(&output);
    assert!(
        combined.contains("HTTPS"),
        "Should mention HTTPS requirement, got: {}",
        combined
    );
}

#[test]
fn test_development_server_starts() {
    assert_starts(
        server_command()
            .env("ACCESS_TOKEN_SECRET", ACCESS_SECRET)
            .env("REFRESH_TOKEN_SECRET", REFRESH_SECRET)
            .args(["--allowed-origin", "http://localhost:5173"]),
    );
}

#[test]
fn test_production_server_starts_with_https_origin() {
    assert_starts(
        server_command()
            .env("ACCESS_TOKEN_SECRET", ACCESS_SECRET)
            .env("REFRESH_TOKEN_SECRET", REFRESH_SECRET)
            .args([
                "--environment",
                "production",
                "--allowed-origin",
                "https://foodhive.example.com",
                "--rotate-refresh-tokens",
            ]),
    );
}

#[test]
fn test_secret_files() {
    let temp_dir = std::env::temp_dir();
    let access_file = temp_dir.join(format!("foodhive_access_{}", std::process::id()));
    let refresh_file = temp_dir.join(format!("foodhive_refresh_{}", std::process::id()));
    fs::write(&access_file, format!("{}\n", ACCESS_SECRET)).unwrap();
    fs::write(&refresh_file, format!("{}\n", REFRESH_SECRET)).unwrap();

    assert_starts(server_command().args([
        "--access-secret-file",
        access_file.to_str().unwrap(),
        "--refresh-secret-file",
        refresh_file.to_str().unwrap(),
    ]));

    fs::remove_file(&access_file).ok();
    fs::remove_file(&refresh_file).ok();
}
