//! Environment echo endpoint
//!
//! Returns the process environment and the request headers as JSON, which
//! lets a load test confirm which instance and which proxy path served it.

use axum::{http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentResponse {
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers: BTreeMap<String, Vec<String>>,
}

impl EnvironmentResponse {
    pub fn capture(headers: &HeaderMap) -> Self {
        let environment = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .collect();

        let mut request_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in headers {
            request_headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Self {
            environment,
            request_headers,
        }
    }
}

pub async fn environment_handler(headers: HeaderMap) -> Json<EnvironmentResponse> {
    Json(EnvironmentResponse::capture(&headers))
}
