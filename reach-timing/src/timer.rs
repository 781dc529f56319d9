use chrono::{Local, NaiveDateTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source for trials: a monotonic reading for elapsed times and a
/// wall-clock reading for file names.
pub trait Clock: Clone + Send + Sync {
    /// Monotonic time since the clock was created.
    fn now(&self) -> Duration;
    fn local_time(&self) -> NaiveDateTime;

    fn elapsed(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}

#[derive(Debug, Clone)]
pub struct MonotonicClock {
    pub start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn local_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    wall: NaiveDateTime,
}

impl ManualClock {
    pub fn new(wall: NaiveDateTime) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            wall,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.nanos.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn local_time(&self) -> NaiveDateTime {
        let offset =
            chrono::Duration::from_std(self.now()).unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + offset
    }
}
