//! Prometheus metrics for the relay.
//!
//! - Push metrics (accepted pushes, evicted messages)
//! - Pull metrics (outcomes, forwarded hand-offs, wait time)
//! - Registry metrics (registered users, queued messages, waiting pullers)

mod helpers;

pub use helpers::{encode_metrics, RegistryMetrics, RelayMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "pebble_relay";

lazy_static! {
    // ============================================================================
    // Push Metrics
    // ============================================================================

    /// Total messages accepted by push
    pub static ref PUSHES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_pushes_total", METRIC_PREFIX),
        "Total messages accepted by push"
    ).unwrap();

    /// Messages evicted from a full per-user buffer
    pub static ref MESSAGES_DROPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_dropped_total", METRIC_PREFIX),
        "Total queued messages evicted to make room for newer ones"
    ).unwrap();

    // ============================================================================
    // Pull Metrics
    // ============================================================================

    /// Completed pulls by outcome (primary, alternate, timeout)
    pub static ref PULLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_pulls_total", METRIC_PREFIX),
        "Total completed pulls by outcome",
        &["outcome"]
    ).unwrap();

    /// Copies handed to a concurrently waiting puller
    pub static ref FORWARDS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_forwards_total", METRIC_PREFIX),
        "Total messages handed to a concurrently waiting puller"
    ).unwrap();

    /// Time a pull spent waiting, by outcome
    pub static ref PULL_WAIT_SECONDS: HistogramVec = register_histogram_vec!(
        format!("{}_pull_wait_seconds", METRIC_PREFIX),
        "Time spent waiting in a pull, in seconds",
        &["outcome"],
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 20.0, 30.0]
    ).unwrap();

    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Users with a queue in the registry
    pub static ref USERS_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_users_registered", METRIC_PREFIX),
        "Number of users with a queue"
    ).unwrap();

    /// Messages currently buffered across all users
    pub static ref MESSAGES_QUEUED: IntGauge = register_int_gauge!(
        format!("{}_messages_queued", METRIC_PREFIX),
        "Messages currently buffered across all users"
    ).unwrap();

    /// Pulls currently blocked waiting for a message
    pub static ref PULLERS_WAITING: IntGauge = register_int_gauge!(
        format!("{}_pullers_waiting", METRIC_PREFIX),
        "Pulls currently waiting for a message"
    ).unwrap();
}
