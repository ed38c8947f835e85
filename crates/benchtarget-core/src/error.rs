use thiserror::Error;

/// Canonical error type for the request-shaping core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A latency token was not a non-negative integer millisecond count.
    #[error("invalid latency token `{token}` at position {position}: {source}")]
    Parse {
        /// Offending token text.
        token: String,
        /// Zero-based index of the token within the source.
        position: usize,
        /// Underlying integer parse failure.
        #[source]
        source: std::num::ParseIntError,
    },

    /// The latency source could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The latency source contained no values.
    #[error("latency source contains no values")]
    EmptySequence,

    /// The admission semaphore was closed. Never expected while the gate is alive.
    #[error("admission gate closed")]
    GateClosed,

    /// Metric registration failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CoreError {
    /// True for errors that come from a malformed or unreadable latency source.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. } | Self::Io(_) | Self::EmptySequence
        )
    }
}

/// Convenient result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
