//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod relay;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use relay::{pull, push, RelayParams, RelayResponse};
pub use routes::api_routes;
