//! Prometheus metrics

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder; returns the render handle for
/// the /metrics endpoint.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_call_started() {
    metrics::counter!("dhvani_calls_started_total").increment(1);
}

pub fn record_call_finished(outcome: &'static str) {
    metrics::counter!("dhvani_calls_finished_total", "outcome" => outcome).increment(1);
}

pub fn record_audio_frame() {
    metrics::counter!("dhvani_audio_frames_in_total").increment(1);
}

pub fn record_turn(duration_ms: u64) {
    metrics::counter!("dhvani_turns_total").increment(1);
    metrics::histogram!("dhvani_turn_duration_ms").record(duration_ms as f64);
}

pub fn record_error(stage: &'static str) {
    metrics::counter!("dhvani_errors_total", "stage" => stage).increment(1);
}
