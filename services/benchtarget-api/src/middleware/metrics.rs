//! Metrics middleware for tracking API requests
//!
//! Records request count, duration and in-flight requests for every HTTP
//! request into the registry owned by [`AppState`]. Duration includes time
//! spent queued at the admission gate.

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, Response},
    middleware::Next,
};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Instant;

/// Request metrics registered into an explicit registry.
#[derive(Clone)]
pub struct HttpMetrics {
    pub requests: IntCounterVec,
    pub duration: HistogramVec,
    pub in_flight: IntGauge,
}

impl HttpMetrics {
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new(
                "http_bench_target_requests_total",
                "Total number of HTTP requests",
            ),
            &["method", "path", "status"],
        )?;

        let duration = HistogramVec::new(
            HistogramOpts::new(
                "http_bench_target_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            // Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "path"],
        )?;

        let in_flight = IntGauge::new(
            "http_bench_target_in_flight_requests",
            "Number of HTTP requests currently being served",
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;

        Ok(Self {
            requests,
            duration,
            in_flight,
        })
    }
}

/// Holds one unit of the in-flight gauge until dropped, including when the
/// request future is cancelled mid-flight.
struct InFlightGuard(IntGauge);

impl InFlightGuard {
    fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Middleware to track API request metrics
pub async fn track_metrics(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let start = Instant::now();
    let method = req.method().clone();

    // Matched path keeps label cardinality bounded
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let metrics = &state.http_metrics;
    let in_flight = InFlightGuard::new(&metrics.in_flight);

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status().as_u16().to_string();

    drop(in_flight);
    metrics
        .requests
        .with_label_values(&[method.as_str(), &path, &status])
        .inc();
    metrics
        .duration
        .with_label_values(&[method.as_str(), &path])
        .observe(duration.as_secs_f64());

    response
}
