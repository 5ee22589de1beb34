use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Issues strictly increasing timestamps with microsecond precision.
///
/// Requests are ordered by their creation timestamp, so two inserts landing in
/// the same microsecond must still receive distinct, ordered values.
#[derive(Debug)]
pub struct ServerClock {
    last_micros: Mutex<i64>,
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerClock {
    /// Create a clock that has not issued any timestamp yet.
    pub fn new() -> Self {
        Self {
            last_micros: Mutex::new(0),
        }
    }

    /// Next timestamp, expressed in microseconds since the Unix epoch.
    pub fn now_micros(&self) -> i64 {
        let wall = to_micros(SystemTime::now());
        let mut last = self.last_micros.lock().unwrap_or_else(PoisonError::into_inner);
        let next = if wall > *last { wall } else { *last + 1 };
        *last = next;
        next
    }

    /// Next timestamp as a [`SystemTime`].
    pub fn now(&self) -> SystemTime {
        from_micros(self.now_micros())
    }
}

/// Convert a timestamp into microseconds since the Unix epoch (clamped at zero).
pub fn to_micros(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Inverse of [`to_micros`].
pub fn from_micros(micros: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_micros(micros.max(0) as u64)
}
