//! Shared integration-test harness for spawning `traffic-light` as a child
//! process and reading its JSONL event stream.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Default timeout for reading a single event.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running `traffic-light run --format json` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
#[allow(clippy::missing_panics_doc)]
pub struct TrafficLightProcess {
    child: Child,
    stdin: Option<tokio::process::ChildStdin>,
    reader: BufReader<tokio::process::ChildStdout>,
    pending_events: Vec<Value>,
}

impl TrafficLightProcess {
    /// Spawns `run` with the given timing config.
    pub fn spawn(config_path: &Path) -> Self {
        Self::spawn_with_args(config_path, &[])
    }

    /// Spawns `run` with the given timing config and extra arguments.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_with_args(config_path: &Path, extra: &[&str]) -> Self {
        let mut child = Command::new(Self::bin())
            .args([
                "run",
                "--config",
                config_path.to_str().expect("non-UTF-8 config path"),
                "--format",
                "json",
                "--quiet",
            ])
            .args(extra)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn traffic-light");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
            pending_events: Vec::new(),
        }
    }

    /// Path to the compiled binary.
    #[must_use]
    pub fn bin() -> &'static str {
        env!("CARGO_BIN_EXE_traffic-light")
    }

    /// Runs the binary to completion with `args`.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> Output {
        std::process::Command::new(Self::bin())
            .args(args)
            .output()
            .expect("failed to run traffic-light")
    }

    /// Writes one line to stdin.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        stdin.flush().await.expect("failed to flush stdin");
    }

    /// Presses "Change".
    pub async fn press(&mut self) {
        self.send_line("").await;
    }

    /// Reads one JSONL event from stdout.
    ///
    /// Panics on EOF, I/O error, or if no event arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_event(&mut self, timeout: Duration) -> Value {
        let mut line = String::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from traffic-light");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str::<Value>(trimmed)
                        .unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {line}"));
                }
            }
        })
        .await;
        result.expect("timed out waiting for event")
    }

    /// Waits for the next event of the given type.
    ///
    /// Anything else read meanwhile is buffered for later calls.
    #[allow(clippy::missing_panics_doc)]
    pub async fn expect_event(&mut self, event_type: &str) -> Value {
        if let Some(idx) = self
            .pending_events
            .iter()
            .position(|e| e["type"] == event_type)
        {
            return self.pending_events.remove(idx);
        }

        loop {
            let event = self.read_event(DEFAULT_TIMEOUT).await;
            if event["type"] == event_type {
                return event;
            }
            self.pending_events.push(event);
        }
    }

    /// Closes stdin, signalling end of input.
    pub fn close_stdin(&mut self) {
        drop(self.stdin.take());
    }

    /// Closes stdin (end of input), waits up to five seconds for the
    /// process to exit, and returns its exit code.
    #[allow(clippy::missing_panics_doc)]
    pub async fn wait(mut self) -> Option<i32> {
        drop(self.stdin.take());
        let status = tokio::time::timeout(Duration::from_secs(5), self.child.wait())
            .await
            .expect("traffic-light did not exit")
            .expect("failed to wait for traffic-light");
        status.code()
    }

    /// Returns the path to a test fixture.
    #[must_use]
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }
}

/// Parses JSONL output into events.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn parse_events(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("invalid JSONL line"))
        .collect()
}

/// Events of one type, in order.
#[must_use]
pub fn of_type<'a>(events: &'a [Value], event_type: &str) -> Vec<&'a Value> {
    events.iter().filter(|e| e["type"] == event_type).collect()
}
