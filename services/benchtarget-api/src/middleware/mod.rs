pub mod admission;
pub mod metrics;

pub use admission::{admission_middleware, QueueWait};
pub use metrics::{track_metrics, HttpMetrics};
