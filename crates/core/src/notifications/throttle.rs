//! Per-recipient alert suppression.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Remembers the last time each key fired and suppresses repeats inside
/// the window. Keys are caller-defined (user, ticket, location cell).
pub struct Throttle {
    window: Duration,
    entries: DashMap<String, DateTime<Utc>>,
}

impl Throttle {
    pub fn new(window_secs: i64) -> Self {
        Throttle {
            window: Duration::seconds(window_secs),
            entries: DashMap::new(),
        }
    }

    /// True when the key may fire now; the firing is recorded atomically.
    pub fn allow(&self, key: &str, now: DateTime<Utc>) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                true
            }
            Entry::Occupied(mut slot) => {
                if now - *slot.get() >= self.window {
                    slot.insert(now);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drops entries older than the window so the map does not grow with
    /// every user that ever walked by.
    pub fn prune(&self, now: DateTime<Utc>) {
        let window = self.window;
        self.entries.retain(|_, last| now - *last < window);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
