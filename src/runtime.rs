//! Runtime glue: configuration, tracing and telemetry, and the quiz loader
//! facade that owns the pool.

pub mod config;
pub mod loader;
pub mod telemetry;
