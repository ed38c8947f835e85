//! API state management
//!
//! Shared state handed to every handler and middleware: the admission gate,
//! the optional latency sequence, and the metrics registry they report into.

use crate::config::BenchTargetConfig;
use crate::error::Result;
use crate::middleware::HttpMetrics;
use axum::http::HeaderName;
use benchtarget_core::{
    AdmissionGate, CompositeObserver, CoreResult, LatencySequence, LogQueueWait,
    QueueWaitHistogram,
};
use prometheus::Registry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Shared application state for the API server
#[derive(Clone)]
pub struct AppState {
    /// Gate in front of every route
    pub gate: AdmissionGate,
    /// Replayed delays; `None` leaves the latency route unmounted
    pub latency: Option<Arc<LatencySequence>>,
    pub latency_route: String,
    pub latency_header: HeaderName,
    /// Registry served on `/metrics`
    pub registry: Registry,
    pub http_metrics: HttpMetrics,
    /// Present only when the gate is enabled
    pub queue_wait: Option<QueueWaitHistogram>,
}

impl AppState {
    /// Build state with a fresh metrics registry.
    pub fn new(
        simulated_workers: usize,
        latency: Option<LatencySequence>,
        latency_route: impl Into<String>,
        latency_header: HeaderName,
        metric_labels: HashMap<String, String>,
    ) -> CoreResult<Self> {
        let registry = Registry::new();
        let http_metrics = HttpMetrics::register(&registry)?;

        let (gate, queue_wait) = if simulated_workers > 0 {
            let histogram = QueueWaitHistogram::register(&registry, metric_labels)?;
            let observer = CompositeObserver::new()
                .with(Arc::new(histogram.clone()))
                .with(Arc::new(LogQueueWait));
            (
                AdmissionGate::new(simulated_workers, Arc::new(observer)),
                Some(histogram),
            )
        } else {
            (AdmissionGate::PassThrough, None)
        };

        Ok(Self {
            gate,
            latency: latency.map(Arc::new),
            latency_route: latency_route.into(),
            latency_header,
            registry,
            http_metrics,
            queue_wait,
        })
    }

    /// Build state from validated configuration, loading the latency file if one is set.
    pub fn from_config(config: &BenchTargetConfig) -> Result<Self> {
        let latency = match &config.latency.filename {
            Some(path) => {
                let sequence = LatencySequence::from_file(path)?;
                info!(
                    path = %path.display(),
                    values = sequence.len(),
                    cycle_ms = sequence.cycle_duration().as_millis() as u64,
                    route = %config.latency.route,
                    "Latency injection enabled"
                );
                Some(sequence)
            }
            None => None,
        };

        let latency_header = HeaderName::from_bytes(config.latency.header.as_bytes())
            .map_err(|e| config::ConfigError::Message(format!("invalid latency.header: {e}")))?;

        let state = Self::new(
            config.gate.simulated_workers,
            latency,
            config.latency.route.clone(),
            latency_header,
            config.metrics.labels.clone(),
        )?;

        if state.gate.is_enabled() {
            info!(
                simulated_workers = state.gate.capacity(),
                "Admission gate enabled"
            );
        } else {
            info!("Admission gate disabled");
        }

        Ok(state)
    }
}
