//! Deterministic cyclic latency injection
//!
//! A [`LatencySequence`] is loaded once at startup from a whitespace-delimited
//! list of millisecond values and hands them out in order, wrapping back to
//! the first value after the last one.
//!
//! # Example
//!
//! ```rust
//! use benchtarget_core::LatencySequence;
//! use std::time::Duration;
//!
//! let seq = LatencySequence::parse("10 20 30").unwrap();
//! assert_eq!(seq.next(), Duration::from_millis(10));
//! assert_eq!(seq.next(), Duration::from_millis(20));
//! assert_eq!(seq.next(), Duration::from_millis(30));
//! assert_eq!(seq.next(), Duration::from_millis(10));
//! ```

use crate::error::{CoreError, CoreResult};
use parking_lot::Mutex;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Ordered, fixed list of delays replayed cyclically.
#[derive(Debug)]
pub struct LatencySequence {
    delays: Vec<Duration>,
    /// Index of the delay handed out by the next call. Always `< delays.len()`.
    cursor: Mutex<usize>,
}

impl LatencySequence {
    /// Build a sequence from already-converted delays.
    pub fn from_delays(delays: Vec<Duration>) -> CoreResult<Self> {
        if delays.is_empty() {
            return Err(CoreError::EmptySequence);
        }

        Ok(Self {
            delays,
            cursor: Mutex::new(0),
        })
    }

    /// Parse whitespace-delimited millisecond values.
    pub fn parse(source: &str) -> CoreResult<Self> {
        let delays = source
            .split_whitespace()
            .enumerate()
            .map(|(position, token)| {
                token
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|source| CoreError::Parse {
                        token: token.to_string(),
                        position,
                        source,
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Self::from_delays(delays)
    }

    /// Read the whole source and parse it.
    pub fn from_reader<R: Read>(mut reader: R) -> CoreResult<Self> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Self::parse(&source)
    }

    /// Load a latency file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let sequence = Self::parse(&source)?;

        debug!(
            path = %path.display(),
            values = sequence.len(),
            "Loaded latency sequence"
        );

        Ok(sequence)
    }

    /// Return the delay at the cursor and advance it, wrapping at the end.
    ///
    /// The lock only covers the index bump. Callers sleep after this returns.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Duration {
        let mut cursor = self.cursor.lock();
        let delay = self.delays[*cursor];
        *cursor = (*cursor + 1) % self.delays.len();
        delay
    }

    /// Number of values in one lap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    /// Companion to [`len`](Self::len) for clippy's `len_without_is_empty`.
    /// Always false, since empty sequences are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// The delays of one lap, in replay order.
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Total delay injected over one full lap.
    #[must_use]
    pub fn cycle_duration(&self) -> Duration {
        self.delays.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn test_sequential_calls_wrap() {
        let seq = LatencySequence::parse("10 20 30").unwrap();

        assert_eq!(seq.next(), Duration::from_millis(10));
        assert_eq!(seq.next(), Duration::from_millis(20));
        assert_eq!(seq.next(), Duration::from_millis(30));
        assert_eq!(seq.next(), Duration::from_millis(10));
    }

    #[test]
    fn test_mixed_whitespace() {
        let seq = LatencySequence::parse("  5\n15\t\t25\r\n0 \n").unwrap();
        assert_eq!(seq.delays(), ms(&[5, 15, 25, 0]).as_slice());
        assert_eq!(seq.cycle_duration(), Duration::from_millis(45));
    }

    #[test]
    fn test_calls_follow_index_mod_len() {
        let values = [3, 1, 4, 1, 5, 9, 2];
        let seq = LatencySequence::from_delays(ms(&values)).unwrap();

        for i in 0..100 {
            assert_eq!(seq.next(), Duration::from_millis(values[i % values.len()]));
        }
    }

    #[test]
    fn test_single_value_repeats() {
        let seq = LatencySequence::parse("42").unwrap();
        for _ in 0..5 {
            assert_eq!(seq.next(), Duration::from_millis(42));
        }
    }

    #[test]
    fn test_empty_source_rejected() {
        assert!(matches!(
            LatencySequence::parse(""),
            Err(CoreError::EmptySequence)
        ));
        assert!(matches!(
            LatencySequence::parse(" \n\t "),
            Err(CoreError::EmptySequence)
        ));
        assert!(matches!(
            LatencySequence::from_delays(Vec::new()),
            Err(CoreError::EmptySequence)
        ));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let err = LatencySequence::parse("10 2x0 30").unwrap_err();
        match err {
            CoreError::Parse {
                token, position, ..
            } => {
                assert_eq!(token, "2x0");
                assert_eq!(position, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_and_fractional_rejected() {
        assert!(matches!(
            LatencySequence::parse("10 -5"),
            Err(CoreError::Parse { position: 1, .. })
        ));
        assert!(matches!(
            LatencySequence::parse("1.5"),
            Err(CoreError::Parse { position: 0, .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "100").unwrap();
        writeln!(file, "200").unwrap();

        let seq = LatencySequence::from_file(file.path()).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.next(), Duration::from_millis(100));
        assert_eq!(seq.next(), Duration::from_millis(200));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LatencySequence::from_file(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(err.is_config());
    }

    #[test]
    fn test_from_reader() {
        let seq = LatencySequence::from_reader("7 8".as_bytes()).unwrap();
        assert_eq!(seq.delays(), ms(&[7, 8]).as_slice());
    }

    #[test]
    fn test_independent_instances_are_identical() {
        let source = "12 0 7 300";
        let a = LatencySequence::parse(source).unwrap();
        let b = LatencySequence::parse(source).unwrap();

        let from_a: Vec<_> = (0..10).map(|_| a.next()).collect();
        let from_b: Vec<_> = (0..10).map(|_| b.next()).collect();
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn test_concurrent_callers_share_laps() {
        let values = [10, 20, 30, 40, 50];
        let seq = Arc::new(LatencySequence::from_delays(ms(&values)).unwrap());
        let threads = 8;
        let calls_per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let seq = Arc::clone(&seq);
                std::thread::spawn(move || {
                    (0..calls_per_thread).map(|_| seq.next()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<Duration, usize> = HashMap::new();
        for handle in handles {
            for delay in handle.join().unwrap() {
                *counts.entry(delay).or_default() += 1;
            }
        }

        // 2000 calls over a 5-value lap: every value handed out exactly 400 times.
        let expected = threads * calls_per_thread / values.len();
        for value in values {
            assert_eq!(counts[&Duration::from_millis(value)], expected);
        }

        // Every tick was consumed, so the cursor is back at the start.
        assert_eq!(seq.next(), Duration::from_millis(10));
    }
}
