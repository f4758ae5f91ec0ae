//! End-to-end behaviour tests: a full daemon on a loopback port, driven
//! over raw HTTP exactly the way editor clients drive it.

use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use perch_config::{DaemonSettings, PORT_FILE_NAME, PROJECT_MARKER_FILE, PortPreference};
use perch_engine::StubEngineFactory;
use tempfile::TempDir;

use crate::lifecycle::{ShutdownCause, ShutdownLatch};
use crate::process::{LaunchError, LaunchPlan, run_daemon_with};

fn test_settings() -> DaemonSettings {
    DaemonSettings {
        idle_window: Duration::from_secs(30),
        ..DaemonSettings::default()
    }
}

/// A daemon running against `root` on a background thread.
///
/// The project directory is owned by the test so assertions about leftover
/// files remain meaningful after the daemon has shut down.
struct DaemonHarness {
    root: PathBuf,
    latch: ShutdownLatch,
    thread: Option<JoinHandle<()>>,
    port: u16,
}

fn start_daemon(settings: DaemonSettings) -> (TempDir, DaemonHarness) {
    let project = TempDir::new().expect("project dir");
    let harness = DaemonHarness::start_in(project.path(), settings);
    (project, harness)
}

impl DaemonHarness {
    fn start_in(root: &Path, settings: DaemonSettings) -> Self {
        let latch = ShutdownLatch::new();
        let plan = LaunchPlan {
            settings: settings.clone(),
            start_dir: root.to_path_buf(),
            factory: Box::new(StubEngineFactory),
            latch: latch.clone(),
        };
        let thread = thread::spawn(move || {
            run_daemon_with(plan).expect("daemon runs");
        });
        let port = match settings.port {
            PortPreference::Explicit(port) => {
                wait_until_reachable(port);
                port
            }
            PortPreference::Ephemeral => read_advertised_port(root),
        };
        Self {
            root: root.to_path_buf(),
            latch,
            thread: Some(thread),
            port,
        }
    }

    fn port_file(&self) -> PathBuf {
        self.root.join(PORT_FILE_NAME)
    }

    fn get(&self, path_and_query: &str) -> String {
        http_exchange(
            self.port,
            &format!(
                "GET {path_and_query} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n"
            ),
        )
    }

    fn post(&self, body: &str) -> String {
        http_exchange(
            self.port,
            &format!(
                "POST / HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ),
        )
    }

    fn shutdown(mut self) {
        self.latch.trigger(ShutdownCause::Signal(15));
        if let Some(thread) = self.thread.take() {
            thread.join().expect("daemon thread");
        }
    }
}

impl Drop for DaemonHarness {
    fn drop(&mut self) {
        // Safety net for panicking tests; the clean path already joined.
        self.latch.trigger(ShutdownCause::Signal(15));
    }
}

fn http_exchange(port: u16, request: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect to daemon");
    stream.write_all(request.as_bytes()).expect("write request");
    let mut response = String::new();
    stream.read_to_string(&mut response).expect("read response");
    response
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or("")
}

fn body_of(response: &str) -> &str {
    response.split("\r\n\r\n").nth(1).unwrap_or("")
}

fn read_advertised_port(root: &Path) -> u16 {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(contents) = fs::read_to_string(root.join(PORT_FILE_NAME))
            && let Ok(port) = contents.trim().parse::<u16>()
        {
            return port;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("daemon did not advertise a port in time");
}

fn wait_until_reachable(port: u16) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("daemon did not start listening in time");
}

fn free_port() -> u16 {
    TcpListener::bind(("127.0.0.1", 0))
        .expect("probe bind")
        .local_addr()
        .expect("probe addr")
        .port()
}

#[test]
fn ping_answers_pong_without_engine_involvement() {
    let (_project, harness) = start_daemon(test_settings());
    for _ in 0..3 {
        let response = harness.get("/ping");
        assert!(status_line(&response).contains("200"), "got: {response}");
        assert_eq!(body_of(&response), "pong");
    }
    harness.shutdown();
}

#[test]
fn malformed_post_gets_400_and_does_not_poison_the_daemon() {
    let (_project, harness) = start_daemon(test_settings());

    let response = harness.post("not json");
    assert!(status_line(&response).contains("400"), "got: {response}");
    assert!(body_of(&response).contains("malformed request document"));

    let response = harness.post(r#"{"type":"files"}"#);
    assert!(status_line(&response).contains("200"), "got: {response}");
    assert!(response.contains("application/json"));
    assert!(body_of(&response).contains("files"));

    harness.shutdown();
}

#[test]
fn bogus_request_document_surfaces_the_engine_error() {
    let (_project, harness) = start_daemon(test_settings());

    // {"type":"bogusRequest"} URL-encoded into the doc parameter.
    let response = harness.get("/?doc=%7B%22type%22%3A%22bogusRequest%22%7D");
    assert!(status_line(&response).contains("400"), "got: {response}");
    assert!(body_of(&response).contains("bogusRequest"));

    harness.shutdown();
}

#[test]
fn get_without_doc_parameter_is_a_400() {
    let (_project, harness) = start_daemon(test_settings());

    let response = harness.get("/");
    assert!(status_line(&response).contains("400"), "got: {response}");
    assert!(body_of(&response).contains("doc"));

    harness.shutdown();
}

#[test]
fn unknown_paths_get_404_naming_the_path() {
    let (_project, harness) = start_daemon(test_settings());

    let response = harness.get("/missing");
    assert!(status_line(&response).contains("404"), "got: {response}");
    assert!(body_of(&response).contains("/missing"));

    harness.shutdown();
}

#[test]
fn oversized_post_bodies_are_rejected_and_serving_continues() {
    let (_project, harness) = start_daemon(test_settings());

    let oversized = "x".repeat(1024 * 1024 + 1);
    let response = harness.post(&oversized);
    assert!(status_line(&response).contains("400"), "got: {response}");
    assert!(body_of(&response).contains("limit"));

    let response = harness.get("/ping");
    assert!(status_line(&response).contains("200"));

    harness.shutdown();
}

#[test]
fn port_file_is_advertised_and_removed_on_clean_exit() {
    let (project, harness) = start_daemon(test_settings());

    let contents = fs::read_to_string(harness.port_file()).expect("read port file");
    assert_eq!(contents, harness.port.to_string());

    harness.shutdown();
    assert!(
        !project.path().join(PORT_FILE_NAME).exists(),
        "clean exit removes the port file"
    );
}

#[test]
fn superseded_port_file_survives_an_older_instance_exit() {
    let (project, harness) = start_daemon(test_settings());
    let path = harness.port_file();

    // A newer daemon instance overwrites the advertisement.
    fs::write(&path, "1").expect("overwrite port file");

    harness.shutdown();
    assert_eq!(
        fs::read_to_string(project.path().join(PORT_FILE_NAME)).expect("read port file"),
        "1",
        "the newer advertisement must survive"
    );
}

#[test]
fn port_file_can_be_suppressed() {
    let settings = DaemonSettings {
        port: PortPreference::Explicit(free_port()),
        write_port_file: false,
        ..test_settings()
    };
    let (project, harness) = start_daemon(settings);

    let response = harness.get("/ping");
    assert!(status_line(&response).contains("200"));

    harness.shutdown();
    assert!(!project.path().join(PORT_FILE_NAME).exists());
}

#[test]
fn explicit_port_binds_exactly_that_port() {
    let port = free_port();
    let settings = DaemonSettings {
        port: PortPreference::Explicit(port),
        ..test_settings()
    };
    let (_project, harness) = start_daemon(settings);

    assert_eq!(harness.port, port);
    assert_eq!(
        fs::read_to_string(harness.port_file()).expect("read port file"),
        port.to_string()
    );

    harness.shutdown();
}

#[test]
fn idle_daemon_exits_after_the_window() {
    let settings = DaemonSettings {
        idle_window: Duration::from_millis(150),
        ..DaemonSettings::default()
    };
    let (_project, harness) = start_daemon(settings);

    assert_eq!(
        harness.latch.wait_timeout(Duration::from_secs(3)),
        Some(ShutdownCause::Idle)
    );
    harness.shutdown();
}

#[test]
fn requests_reset_the_idle_window() {
    let settings = DaemonSettings {
        idle_window: Duration::from_millis(400),
        ..DaemonSettings::default()
    };
    let (_project, harness) = start_daemon(settings);

    for _ in 0..5 {
        thread::sleep(Duration::from_millis(150));
        let response = harness.get("/ping");
        assert!(status_line(&response).contains("200"));
    }
    assert_eq!(harness.latch.wait_timeout(Duration::from_millis(10)), None);

    harness.shutdown();
}

#[test]
fn persistent_daemon_ignores_idle_expiry() {
    let settings = DaemonSettings {
        idle_window: Duration::from_millis(100),
        persistent: true,
        ..DaemonSettings::default()
    };
    let (_project, harness) = start_daemon(settings);

    assert_eq!(
        harness.latch.wait_timeout(Duration::from_millis(500)),
        None
    );
    let response = harness.get("/ping");
    assert!(status_line(&response).contains("200"));

    harness.shutdown();
}

#[test]
fn marker_file_configuration_reaches_the_engine() {
    let project = TempDir::new().expect("project dir");
    fs::write(
        project.path().join(PROJECT_MARKER_FILE),
        r#"{"loadEagerly": ["main.js"]}"#,
    )
    .expect("write marker");
    fs::write(project.path().join("main.js"), "var answer = 42;").expect("write source");

    let harness = DaemonHarness::start_in(project.path(), test_settings());

    let response = harness.post(r#"{"type":"files"}"#);
    assert!(status_line(&response).contains("200"), "got: {response}");
    assert!(body_of(&response).contains("main.js"));

    harness.shutdown();
}

#[test]
fn malformed_marker_file_aborts_startup_before_binding() {
    let project = TempDir::new().expect("project dir");
    fs::write(project.path().join(PROJECT_MARKER_FILE), "{broken").expect("write marker");

    let plan = LaunchPlan {
        settings: test_settings(),
        start_dir: project.path().to_path_buf(),
        factory: Box::new(StubEngineFactory),
        latch: ShutdownLatch::new(),
    };
    let error = run_daemon_with(plan).expect_err("startup must fail");
    assert!(matches!(error, LaunchError::Configuration(_)));
    assert!(
        !project.path().join(PORT_FILE_NAME).exists(),
        "no advertisement may be written for a daemon that never bound"
    );
}

#[test]
fn concurrent_requests_all_get_answers() {
    let (_project, harness) = start_daemon(test_settings());
    let port = harness.port;

    let clients: Vec<JoinHandle<String>> = (0..8)
        .map(|_| {
            thread::spawn(move || {
                http_exchange(
                    port,
                    "GET /ping HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n",
                )
            })
        })
        .collect();

    for client in clients {
        let response = client.join().expect("client thread");
        assert!(status_line(&response).contains("200"), "got: {response}");
    }

    harness.shutdown();
}
