use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

/// Issues record ids derived from the creation instant: decimal milliseconds
/// since the epoch, strictly increasing for the life of the generator.
///
/// Two creates in the same millisecond get consecutive values instead of
/// colliding.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicI64,
}

impl IdGenerator {
    /// A generator whose next id is greater than `floor`. Used when reopening
    /// a persistent store so ids never go backwards across restarts.
    pub fn starting_after(floor: i64) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    pub fn next_at(&self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(millis.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        millis.max(prev + 1).to_string()
    }
}
