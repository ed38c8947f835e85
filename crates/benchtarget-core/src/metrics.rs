//! Queue-wait observers
//!
//! The admission gate does not know where its measurements go. It is handed a
//! [`QueueWaitObserver`] at construction and reports every queue wait to it.
//! Metrics are registered into a caller-provided [`Registry`] rather than the
//! process-global default registry.

use crate::error::CoreResult;
use prometheus::{Histogram, HistogramOpts, Registry};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Name of the queue-wait histogram exposed on `/metrics`.
pub const QUEUE_WAIT_METRIC: &str = "http_bench_target_queue_wait_seconds";

/// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
const QUEUE_WAIT_BUCKETS: [f64; 13] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Receives the queue wait of every admitted unit of work.
pub trait QueueWaitObserver: Send + Sync {
    fn observe(&self, wait: Duration);
}

/// Prometheus histogram of queue waits in seconds.
#[derive(Clone)]
pub struct QueueWaitHistogram {
    histogram: Histogram,
}

impl QueueWaitHistogram {
    /// Create the histogram and register it in `registry`.
    ///
    /// `const_labels` are attached to every sample, e.g. `{"deployment": "canary"}`.
    pub fn register(registry: &Registry, const_labels: HashMap<String, String>) -> CoreResult<Self> {
        let opts = HistogramOpts::new(
            QUEUE_WAIT_METRIC,
            "Time requests spent waiting for a simulated worker slot",
        )
        .const_labels(const_labels)
        .buckets(QUEUE_WAIT_BUCKETS.to_vec());

        let histogram = Histogram::with_opts(opts)?;
        registry.register(Box::new(histogram.clone()))?;

        Ok(Self { histogram })
    }

    /// Number of queue waits observed so far.
    #[must_use]
    pub fn sample_count(&self) -> u64 {
        self.histogram.get_sample_count()
    }

    /// Total observed queue wait, in seconds.
    #[must_use]
    pub fn sample_sum(&self) -> f64 {
        self.histogram.get_sample_sum()
    }
}

impl QueueWaitObserver for QueueWaitHistogram {
    fn observe(&self, wait: Duration) {
        self.histogram.observe(wait.as_secs_f64());
    }
}

/// Emits one structured log event per admission.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogQueueWait;

impl QueueWaitObserver for LogQueueWait {
    fn observe(&self, wait: Duration) {
        tracing::info!(
            queue_wait_ms = wait.as_secs_f64() * 1000.0,
            "time in queue"
        );
    }
}

/// Forwards each measurement to every inner observer in order.
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn QueueWaitObserver>>,
}

impl CompositeObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, observer: Arc<dyn QueueWaitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl QueueWaitObserver for CompositeObserver {
    fn observe(&self, wait: Duration) {
        for observer in &self.observers {
            observer.observe(wait);
        }
    }
}
