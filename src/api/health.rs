use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: usize,
    pub queued_messages: usize,
    pub waiting_pullers: usize,
    pub capacity: usize,
    pub pull_timeout_seconds: u64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let registry = state.relay.stats().await;
    let config = state.relay.config();

    Json(StatsResponse {
        users: registry.users,
        queued_messages: registry.queued_messages,
        waiting_pullers: registry.waiting_pullers,
        capacity: config.capacity,
        pull_timeout_seconds: config.pull_timeout.as_secs(),
    })
}
