//! Bounded admission of concurrent work
//!
//! An [`AdmissionGate`] simulates a fixed pool of workers. With capacity `C`,
//! at most `C` units of work hold a slot at any time; later arrivals queue
//! until a slot frees up. The time spent queueing is reported to the injected
//! [`QueueWaitObserver`].
//!
//! Capacity 0 builds the [`AdmissionGate::PassThrough`] variant: no slots, no
//! blocking, no measurement.
//!
//! Waiters are not admitted in any guaranteed order. Only the occupancy bound
//! is guaranteed.
//!
//! # Example
//!
//! ```rust
//! use benchtarget_core::{AdmissionGate, LogQueueWait};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> benchtarget_core::CoreResult<()> {
//! let gate = AdmissionGate::new(4, Arc::new(LogQueueWait));
//! let answer = gate.run(async { 40 + 2 }).await?;
//! assert_eq!(answer, 42);
//! assert_eq!(gate.occupancy(), 0);
//! # Ok(())
//! # }
//! ```

use crate::error::{CoreError, CoreResult};
use crate::metrics::QueueWaitObserver;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Concurrency limiter placed in front of request handlers.
#[derive(Clone)]
pub enum AdmissionGate {
    /// Capacity 0: every unit of work runs immediately.
    PassThrough,

    /// At most `capacity` units of work hold a slot at once.
    Bounded {
        capacity: usize,
        slots: Arc<Semaphore>,
        observer: Arc<dyn QueueWaitObserver>,
    },
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassThrough => f.write_str("PassThrough"),
            Self::Bounded {
                capacity, slots, ..
            } => f
                .debug_struct("Bounded")
                .field("capacity", capacity)
                .field("available", &slots.available_permits())
                .finish(),
        }
    }
}

impl AdmissionGate {
    /// Build a gate with `capacity` slots; 0 disables the gate.
    pub fn new(capacity: usize, observer: Arc<dyn QueueWaitObserver>) -> Self {
        if capacity == 0 {
            return Self::PassThrough;
        }

        Self::Bounded {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            observer,
        }
    }

    /// Whether requests can be queued at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Configured capacity; 0 for a pass-through gate.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self {
            Self::PassThrough => 0,
            Self::Bounded { capacity, .. } => *capacity,
        }
    }

    /// Units currently holding a slot. Always 0 for a pass-through gate.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        match self {
            Self::PassThrough => 0,
            Self::Bounded {
                capacity, slots, ..
            } => capacity - slots.available_permits(),
        }
    }

    /// Wait for a free slot.
    ///
    /// Dropping the returned future before it resolves abandons the wait; no
    /// slot is taken and nothing is observed. The slot is released when the
    /// returned [`Admission`] is dropped.
    pub async fn admit(&self) -> CoreResult<Admission> {
        match self {
            Self::PassThrough => Ok(Admission {
                permit: None,
                queue_wait: None,
            }),
            Self::Bounded {
                slots, observer, ..
            } => {
                let arrived = Instant::now();
                let permit = Arc::clone(slots)
                    .acquire_owned()
                    .await
                    .map_err(|_| CoreError::GateClosed)?;
                let queue_wait = arrived.elapsed();

                observer.observe(queue_wait);

                Ok(Admission {
                    permit: Some(permit),
                    queue_wait: Some(queue_wait),
                })
            }
        }
    }

    /// Run `work` while holding a slot.
    ///
    /// The slot is released however `work` ends, including a panic unwinding
    /// through this future or the future being dropped mid-flight.
    pub async fn run<F, T>(&self, work: F) -> CoreResult<T>
    where
        F: Future<Output = T>,
    {
        let _admission = self.admit().await?;
        Ok(work.await)
    }
}

/// A held slot. Releases on drop.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the admission is dropped"]
pub struct Admission {
    permit: Option<OwnedSemaphorePermit>,
    queue_wait: Option<Duration>,
}

impl Admission {
    /// Time spent queueing; `None` when the gate is a pass-through.
    #[must_use]
    pub fn queue_wait(&self) -> Option<Duration> {
        self.queue_wait
    }

    /// True if this admission occupies a slot.
    #[must_use]
    pub fn holds_slot(&self) -> bool {
        self.permit.is_some()
    }
}
