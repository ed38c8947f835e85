//! Latency injection endpoint
//!
//! Each call takes the next delay from the shared [`LatencySequence`], sleeps
//! for it, and reports the delay in a response header.
//!
//! [`LatencySequence`]: benchtarget_core::LatencySequence

use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

pub async fn latency_handler(State(state): State<AppState>) -> Response {
    let Some(sequence) = state.latency.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // The cursor lock is released before the sleep.
    let delay = sequence.next();
    tokio::time::sleep(delay).await;

    debug!(delay_ms = delay.as_millis() as u64, "Injected latency");

    (
        StatusCode::OK,
        [(
            state.latency_header.clone(),
            humantime::format_duration(delay).to_string(),
        )],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderName;
    use benchtarget_core::LatencySequence;
    use std::collections::HashMap;
    use std::time::Duration;

    fn state(source: Option<&str>) -> AppState {
        AppState::new(
            0,
            source.map(|s| LatencySequence::parse(s).unwrap()),
            "/latency",
            HeaderName::from_static("selected-latency"),
            HashMap::new(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_and_reports_selected_latency() {
        let state = state(Some("10 1500 0"));

        let mut reported = Vec::new();
        for expected_sleep in [10u64, 1500, 0, 10] {
            let started = tokio::time::Instant::now();
            let response = latency_handler(State(state.clone())).await;

            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(started.elapsed(), Duration::from_millis(expected_sleep));
            reported.push(
                response.headers()["selected-latency"]
                    .to_str()
                    .unwrap()
                    .to_string(),
            );
        }

        assert_eq!(reported, vec!["10ms", "1s 500ms", "0s", "10ms"]);
    }

    #[tokio::test]
    async fn test_without_sequence_is_not_found() {
        let response = latency_handler(State(state(None))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
