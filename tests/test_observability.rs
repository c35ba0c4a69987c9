mod common;

use std::time::Duration;

use common::{TrafficLightProcess, of_type, parse_events};

/// A port that was free a moment ago.
fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn scrape(port: u16) -> String {
    let url = format!("http://127.0.0.1:{port}/metrics");
    let client = reqwest::Client::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        match client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => {
                assert!(resp.status().is_success(), "metrics endpoint returned error");
                return resp.text().await.expect("should read body");
            }
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => panic!("metrics endpoint never came up: {e}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_endpoint_serves_prometheus() {
    let port = free_port();
    let config = TrafficLightProcess::fixture_path("fast_timing.yaml");
    let mut light =
        TrafficLightProcess::spawn_with_args(&config, &["--metrics-port", &port.to_string()]);
    light.expect_event("ControllerStarted").await;

    // One accepted press, one ignored, then let the deferred half land.
    light.press().await;
    light.press().await;
    light.expect_event("AdvanceRequested").await;
    light.expect_event("AdvanceRequested").await;
    light.expect_event("LampsChanged").await;
    light.expect_event("LampsChanged").await;

    let body = scrape(port).await;
    for needle in [
        "traffic_light_requests_total",
        "outcome=\"accepted\"",
        "outcome=\"ignored\"",
        "traffic_light_transitions_total",
        "cause=\"request\"",
        "cause=\"deferred\"",
        "traffic_light_lamp_lit",
        "color=\"green\"",
    ] {
        assert!(body.contains(needle), "missing {needle} in:\n{body}");
    }

    light.send_line("q").await;
    assert_eq!(light.wait().await, Some(0));
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_port_in_use_fails() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    let config = TrafficLightProcess::fixture_path("fast_timing.yaml");

    let output = TrafficLightProcess::spawn_command(&[
        "simulate",
        "--quiet",
        "--config",
        config.to_str().unwrap(),
        "--metrics-port",
        &port,
        "--press",
        "0ms",
    ]);
    drop(listener);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("metrics setup failed"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn events_file_written_alongside_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    let events_path = tmp.path().join("events.jsonl");
    let config = TrafficLightProcess::fixture_path("fast_timing.yaml");
    let mut light = TrafficLightProcess::spawn_with_args(
        &config,
        &["--events", events_path.to_str().unwrap()],
    );
    light.expect_event("ControllerStarted").await;

    light.press().await;
    light.expect_event("LampsChanged").await;
    light.expect_event("LampsChanged").await;
    assert_eq!(light.wait().await, Some(0));

    let contents = std::fs::read(&events_path).expect("events file should exist");
    let events = parse_events(&contents);
    assert_eq!(events.first().unwrap()["type"], "ControllerStarted");
    assert_eq!(events.last().unwrap()["type"], "ControllerStopped");
    assert_eq!(events.last().unwrap()["reason"], "end of input");
    assert_eq!(of_type(&events, "AdvanceRequested").len(), 1);
    assert_eq!(of_type(&events, "LampsChanged").len(), 2);

    let sequences: Vec<u64> = events
        .iter()
        .map(|e| e["sequence"].as_u64().expect("sequence should be u64"))
        .collect();
    assert!(
        sequences.windows(2).all(|w| w[1] == w[0] + 1),
        "sequence numbers not contiguous: {sequences:?}"
    );
}
