//! CPU burn endpoint
//!
//! `GET /cpu?iterations=N&sleep=D` spins through `N` iterations, yielding to
//! the scheduler every 1000, then sleeps for `D` before answering.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_ITERATIONS: u64 = 1000;
const YIELD_EVERY: u64 = 1000;

/// Raw query parameters. Empty values fall back to defaults.
#[derive(Debug, Default, Deserialize)]
pub struct CpuQuery {
    pub iterations: Option<String>,
    pub sleep: Option<String>,
}

#[derive(Debug, Error)]
pub enum CpuProfileError {
    #[error("invalid iterations '{value}': {source}")]
    Iterations {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("invalid sleep '{value}': {source}")]
    Sleep {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}

impl IntoResponse for CpuProfileError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Work requested by a single `/cpu` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuProfile {
    pub iterations: u64,
    pub sleep: Duration,
}

impl CpuProfile {
    pub fn from_query(query: &CpuQuery) -> Result<Self, CpuProfileError> {
        let iterations = match non_empty(&query.iterations) {
            Some(value) => value
                .parse::<u64>()
                .map_err(|source| CpuProfileError::Iterations {
                    value: value.to_string(),
                    source,
                })?,
            None => DEFAULT_ITERATIONS,
        };

        let sleep = match non_empty(&query.sleep) {
            Some(value) => {
                humantime::parse_duration(value).map_err(|source| CpuProfileError::Sleep {
                    value: value.to_string(),
                    source,
                })?
            }
            None => Duration::ZERO,
        };

        Ok(Self { iterations, sleep })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Spin for `iterations` rounds, cooperatively yielding so one request cannot
/// monopolise a worker thread.
async fn burn(iterations: u64) -> u64 {
    let mut acc: u64 = 0;
    for i in 1..iterations {
        acc = acc.wrapping_add(std::hint::black_box(i));
        if i % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }
    std::hint::black_box(acc)
}

pub async fn cpu_handler(Query(query): Query<CpuQuery>) -> Result<String, CpuProfileError> {
    let profile = CpuProfile::from_query(&query)?;

    burn(profile.iterations).await;
    tokio::time::sleep(profile.sleep).await;

    debug!(
        iterations = profile.iterations,
        sleep_ms = profile.sleep.as_millis() as u64,
        "CPU burn complete"
    );

    Ok(format!("iterations={}\n", profile.iterations))
}
