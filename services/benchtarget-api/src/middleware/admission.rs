//! Admission gate middleware
//!
//! Holds every request at the gate until a simulated worker is free. The slot
//! is held for the whole downstream call and released when this middleware's
//! future completes, unwinds, or is dropped.
//!
//! # Example
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/cpu", get(cpu_handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         state.clone(),
//!         admission_middleware,
//!     ));
//! ```

use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::Span;

/// Request extension carrying how long the request queued at the gate.
#[derive(Clone, Copy, Debug)]
pub struct QueueWait(pub Duration);

pub async fn admission_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let admission = match state.gate.admit().await {
        Ok(admission) => admission,
        Err(err) => {
            tracing::error!(error = %err, "Admission gate unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "Simulated workers unavailable.",
            )
                .into_response();
        }
    };

    if let Some(wait) = admission.queue_wait() {
        Span::current().record("queue_wait_ms", wait.as_secs_f64() * 1000.0);
        request.extensions_mut().insert(QueueWait(wait));
    }

    let response = next.run(request).await;
    drop(admission);
    response
}
