//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Command-line options and application settings
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics and recording helpers

pub mod config;
pub mod error;
pub mod metrics;
