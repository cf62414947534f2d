//! Sliding-window rate limiter for the AI adapter's per-minute request cap.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::AiError;

/// Bounds calls to `capacity` per rolling `window`. Callers that exceed the
/// window block until the oldest call ages out, or until `cancellation`
/// fires.
pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn per_minute(capacity: usize) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// Block (cooperatively) until a slot is available, then consume it.
    /// Returns `Err(AiError::Cancelled)` if `cancellation` fires first.
    pub async fn acquire(&self, cancellation: &CancellationToken) -> Result<(), AiError> {
        loop {
            let wait = self.try_acquire_or_wait();
            match wait {
                None => return Ok(()),
                Some(wait_for) => {
                    tokio::select! {
                        _ = tokio::time::sleep(wait_for) => continue,
                        _ = cancellation.cancelled() => return Err(AiError::Cancelled),
                    }
                }
            }
        }
    }

    /// Purges expired timestamps and either records a new call (returning
    /// `None`) or reports how long the caller must wait for the oldest
    /// timestamp to age out (returning `Some(duration)`).
    fn try_acquire_or_wait(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        while let Some(&oldest) = timestamps.front() {
            if now.duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() < self.capacity {
            timestamps.push_back(now);
            None
        } else {
            let oldest = *timestamps.front().expect("capacity > 0 implies non-empty when full");
            Some(self.window.saturating_sub(now.duration_since(oldest)))
        }
    }
}
