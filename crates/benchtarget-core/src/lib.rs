//! Request-shaping primitives for the HTTP benchmark target.
//!
//! - [`LatencySequence`] replays a recorded list of delays cyclically.
//! - [`AdmissionGate`] bounds how many requests run concurrently and reports
//!   how long each one queued.

pub mod error;
pub mod gate;
pub mod latency;
pub mod metrics;

pub use error::{CoreError, CoreResult};
pub use gate::{Admission, AdmissionGate};
pub use latency::LatencySequence;
pub use metrics::{CompositeObserver, LogQueueWait, QueueWaitHistogram, QueueWaitObserver};
