//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    FORWARDS_TOTAL, MESSAGES_DROPPED_TOTAL, MESSAGES_QUEUED, PULLERS_WAITING, PULLS_TOTAL,
    PULL_WAIT_SECONDS, PUSHES_TOTAL, USERS_REGISTERED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording push and pull metrics
pub struct RelayMetrics;

impl RelayMetrics {
    /// Record an accepted push and the messages it evicted
    pub fn record_push(dropped: usize) {
        PUSHES_TOTAL.inc();
        if dropped > 0 {
            MESSAGES_DROPPED_TOTAL.inc_by(dropped as u64);
        }
    }

    /// Record a completed pull
    pub fn record_pull(outcome: &str, waited: Duration) {
        PULLS_TOTAL.with_label_values(&[outcome]).inc();
        PULL_WAIT_SECONDS
            .with_label_values(&[outcome])
            .observe(waited.as_secs_f64());
    }

    /// Record a copy handed to a concurrent puller
    pub fn record_forwarded() {
        FORWARDS_TOTAL.inc();
    }
}

/// Helper struct for registry-wide gauges
pub struct RegistryMetrics;

impl RegistryMetrics {
    /// Record a newly created user queue
    pub fn record_user_registered() {
        USERS_REGISTERED.inc();
    }

    /// Refresh buffered-message and waiting-puller gauges
    pub fn set_totals(queued: usize, waiting: usize) {
        MESSAGES_QUEUED.set(queued as i64);
        PULLERS_WAITING.set(waiting as i64);
    }
}
