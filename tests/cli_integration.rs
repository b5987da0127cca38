use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output};
use std::thread;

fn run_hipchat(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_hipchat"));
    command
        .args(args)
        .env_remove("HIPCHAT_ORG")
        .env_remove("HIPCHAT_TOKEN")
        .env_remove("HIPCHAT_API_BASE_URL")
        .env_remove("HIPCHAT_CACHE_PATH")
        .env_remove("HIPCHAT_LOG");
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("failed to execute hipchat binary")
}

/// Answers every request with 401 until the test process exits.
fn reject_all_requests() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let body = r#"{"error": {"code": 401, "message": "Invalid OAuth session"}}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/v2")
}

#[test]
fn rejected_token_exits_cleanly_with_auth_message() {
    let base_url = reject_all_requests();
    let output = run_hipchat(
        &["admin"],
        &[
            ("HIPCHAT_ORG", "acme"),
            ("HIPCHAT_TOKEN", "expired"),
            ("HIPCHAT_API_BASE_URL", &base_url),
        ],
    );
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Authentication failed"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn rejected_token_during_unread_is_also_clean() {
    let base_url = reject_all_requests();
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_path = dir.path().join("directory.json");
    let output = run_hipchat(
        &["unread"],
        &[
            ("HIPCHAT_ORG", "acme"),
            ("HIPCHAT_TOKEN", "expired"),
            ("HIPCHAT_API_BASE_URL", &base_url),
            ("HIPCHAT_CACHE_PATH", cache_path.to_str().expect("utf8 path")),
        ],
    );
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Authentication failed"), "stderr: {stderr}");
    assert!(!cache_path.exists());
}

#[test]
fn missing_credentials_exit_cleanly_with_a_hint() {
    let output = run_hipchat(&["unread"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HIPCHAT_ORG must be set"), "stdout: {stdout}");
}

#[test]
fn missing_token_is_named() {
    let output = run_hipchat(&["admin"], &[("HIPCHAT_ORG", "acme")]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HIPCHAT_TOKEN must be set"), "stdout: {stdout}");
}

#[test]
fn help_lists_every_subcommand() {
    let output = run_hipchat(&["--help"], &[]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["room", "unread", "emoticon", "edits", "admin", "cache"] {
        assert!(stdout.contains(name), "missing {name} in help: {stdout}");
    }
}

#[test]
fn cache_reports_absent_snapshot_without_network() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_path = dir.path().join("directory.json");
    let cache_path = cache_path.to_str().expect("utf8 path");
    let output = run_hipchat(
        &["cache"],
        &[
            ("HIPCHAT_ORG", "acme"),
            ("HIPCHAT_TOKEN", "secret"),
            ("HIPCHAT_CACHE_PATH", cache_path),
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("no cache"), "stdout: {stdout}");
    assert!(stdout.contains(cache_path), "stdout: {stdout}");
}

#[test]
fn unreachable_service_fails_with_nonzero_status() {
    let output = run_hipchat(
        &["admin"],
        &[
            ("HIPCHAT_ORG", "acme"),
            ("HIPCHAT_TOKEN", "secret"),
            ("HIPCHAT_API_BASE_URL", "http://127.0.0.1:9/v2"),
        ],
    );
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}
