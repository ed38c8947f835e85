use tracing::debug;

/// Liveness probe. Always `200 OK` while the process serves requests.
pub async fn healthz() -> &'static str {
    debug!("Health check requested");
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_healthz_body() {
        assert_eq!(healthz().await, "OK");
    }
}
