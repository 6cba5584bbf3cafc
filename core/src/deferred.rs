use web_time::{Duration, Instant};

/// A payload released once, some time after it was armed.
///
/// The clock starts on the first poll so arming does not need a timestamp. Dropping the value cancels it.
#[derive(Clone, Debug, PartialEq)]
pub struct Deferred<T> {
    payload: T,
    delay: Duration,
    started_at: Option<Instant>,
}

impl<T> Deferred<T> {
    pub fn new(payload: T, delay: Duration) -> Self {
        Self {
            payload,
            delay,
            started_at: None,
        }
    }

    pub fn is_due(&mut self, now: Instant) -> bool {
        let started_at = *self.started_at.get_or_insert(now);
        now.saturating_duration_since(started_at) >= self.delay
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}
