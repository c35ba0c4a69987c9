//! Metrics collection.
//!
//! Prometheus-compatible counters and gauges for the phase controller.
//! Label values come from closed enums, so cardinality is fixed.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TrafficLightError;
use crate::phase::{LampChange, LampColor};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `TrafficLightError::Metrics` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TrafficLightError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TrafficLightError::Metrics(e.to_string()))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "traffic_light_requests_total",
        "Advance requests, by outcome (accepted or ignored)"
    );
    describe_counter!(
        "traffic_light_transitions_total",
        "Lamp changes, by cause (request or deferred)"
    );
    describe_gauge!(
        "traffic_light_lamp_lit",
        "Whether a lamp is lit (1) or dark (0)"
    );
}

/// Records an advance request.
pub fn record_request(accepted: bool) {
    let outcome = if accepted { "accepted" } else { "ignored" };
    counter!("traffic_light_requests_total", "outcome" => outcome).increment(1);
}

/// Records a lamp change and updates the per-lamp gauges.
pub fn record_lamp_change(change: &LampChange) {
    counter!("traffic_light_transitions_total", "cause" => change.cause.as_str()).increment(1);
    for color in LampColor::ALL {
        let lit = if change.lamps.get(color).is_lit() {
            1.0
        } else {
            0.0
        };
        gauge!("traffic_light_lamp_lit", "color" => color.as_str()).set(lit);
    }
}
