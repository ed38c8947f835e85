use crate::{
    handlers::{cpu_handler, environment_handler, healthz, latency_handler, metrics_handler},
    middleware::{admission_middleware, track_metrics},
    state::AppState,
};
use axum::{extract::Request, middleware, response::Response, routing::get, Router};
use tower_http::{catch_panic::CatchPanicLayer, classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{field, info_span, Span};
use uuid::Uuid;

/// Builds the Axum router for the benchmark target.
///
/// Layers, outermost first: request span and logging, request metrics, panic
/// recovery, admission gate. Queue time therefore counts towards the recorded
/// request duration, and a panicking handler still releases its slot before
/// being turned into a 500.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/healthz", get(healthz))
        .route("/environment", get(environment_handler))
        .route("/cpu", get(cpu_handler))
        .route("/metrics", get(metrics_handler));

    if state.latency.is_some() {
        router = router.route(&state.latency_route, get(latency_handler));
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                        queue_wait_ms = field::Empty,
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::debug!("started processing request");
                })
                .on_response(|response: &Response, latency: std::time::Duration, _span: &Span| {
                    let status = response.status();
                    let latency_ms = latency.as_millis();

                    if status.is_server_error() {
                        tracing::error!(status = %status, latency_ms = latency_ms, "request failed with server error");
                    } else if status.is_client_error() {
                        tracing::warn!(status = %status, latency_ms = latency_ms, "request failed with client error");
                    } else {
                        tracing::info!(status = %status, latency_ms = latency_ms, "request completed");
                    }
                })
                .on_failure(|failure_class: ServerErrorsFailureClass, latency: std::time::Duration, _span: &Span| {
                    tracing::error!(failure_class = ?failure_class, latency_ms = latency.as_millis(), "request failed");
                }),
        )
}
