//! HTTP handlers for the benchmark endpoints

pub mod cpu;
pub mod environment;
pub mod health;
pub mod latency;
pub mod metrics;

pub use cpu::{cpu_handler, CpuProfile, CpuProfileError, CpuQuery};
pub use environment::{environment_handler, EnvironmentResponse};
pub use health::healthz;
pub use latency::latency_handler;
pub use metrics::metrics_handler;
