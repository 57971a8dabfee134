// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-crate integration specs for the `hpm` binary.
//!
//! These exercise the CLI surface end-to-end: exit codes, the registry
//! introspection format, and the supervisor's connection-first path against
//! a minimal stand-in HTTP server. Scenarios that need a real PM service
//! (long-poll task assignment) are covered at the library level
//! in `hpm-engine`/`hpm-daemon`'s own test suites instead; nothing here
//! re-implements the PM service itself.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use assert_cmd::Command;
use serial_test::serial;

fn hpm() -> Command {
    Command::cargo_bin("hpm").expect("hpm binary")
}

/// A tiny blocking HTTP/1.1 server that answers every request with a fixed
/// status and body, just enough for the supervisor's `/health` probe and
/// the registration the CLI doesn't exercise in these tests.
struct StubServer {
    port: u16,
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl StubServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let port = listener.local_addr().expect("local addr").port();
        listener.set_nonblocking(true).expect("nonblocking");
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();

        let handle = std::thread::spawn(move || {
            while !stop_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => handle_connection(stream),
                    Err(_) => std::thread::sleep(std::time::Duration::from_millis(20)),
                }
            }
        });

        Self { port, stop, handle: Some(handle) }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(mut stream: TcpStream) {
    let mut buf = [0u8; 1024];
    let _ = stream.read(&mut buf);
    let body = "{}";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn registry_path(port: u16) -> PathBuf {
    std::env::temp_dir().join(format!("headless_pm_mcp_clients_{port}.json"))
}

fn cleanup_registry(port: u16) {
    let path = registry_path(port);
    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("json.lock"));
}

#[test]
#[serial]
fn agent_run_exits_one_when_no_api_key_is_configured() {
    hpm()
        .env_remove("HEADLESS_PM_API_KEY")
        .env_remove("API_KEY_HEADLESS_PM")
        .env_remove("API_KEY")
        .args(["agent", "run", "--role", "backend-dev", "--skill-level", "senior"])
        .assert()
        .failure()
        .code(1);
}

#[test]
#[serial]
fn agent_run_exits_one_when_the_instructions_file_is_missing() {
    let dir = tempfile::tempdir().expect("dir");
    hpm()
        .env("HEADLESS_PM_API_KEY", "secret")
        .args([
            "agent",
            "run",
            "--role",
            "qa",
            "--skill-level",
            "junior",
            "--repository",
            dir.path().to_str().expect("utf8"),
            "--instructions-dir",
            dir.path().join("nonexistent").to_str().expect("utf8"),
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
#[serial]
fn registry_status_on_an_empty_registry_reports_no_processes() {
    let port = 58_201;
    cleanup_registry(port);

    let output = hpm()
        .args(["registry", "status", "--port", &port.to_string()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(parsed["processes"], serde_json::json!({}));
    assert!(parsed["primary_api"].is_null());

    cleanup_registry(port);
}

/// Connection-first: a healthy server is already reachable on the
/// target port, so `supervisor ensure` must register as a peer without
/// spawning anything.
#[test]
#[serial]
fn supervisor_ensure_connects_to_an_already_running_server_without_spawning() {
    let server = StubServer::start();
    let port = server.port;
    cleanup_registry(port);

    let output = hpm()
        .env("HEADLESS_PM_API_KEY", "secret")
        .args(["supervisor", "ensure", "--port", &port.to_string(), "--client-id", "spec-client"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(parsed["started_by_us"], serde_json::json!(false));

    let registry: serde_json::Value =
        serde_json::from_slice(&std::fs::read(registry_path(port)).expect("registry file")).expect("json");
    assert_eq!(registry["processes"].as_object().expect("object").len(), 1);

    cleanup_registry(port);
}

#[test]
#[serial]
fn supervisor_shutdown_is_a_no_op_for_a_client_that_never_started_the_server() {
    let port = 58_203;
    cleanup_registry(port);

    hpm()
        .args(["supervisor", "shutdown", "--port", &port.to_string(), "--client-id", "never-started-anything"])
        .assert()
        .success();

    cleanup_registry(port);
}
