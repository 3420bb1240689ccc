//! Event buffer with an offline side queue.

use journey_core::Event;
use std::time::{Duration, Instant};

/// Ordered, network-bound buffer plus the queue used while offline.
///
/// Detaching (`take_batch`, `take_all`) moves events out before any
/// send begins, so a second flush trigger only ever sees a fresh buffer.
#[derive(Debug)]
pub struct EventBuffer {
    live: Vec<Event>,
    offline: Vec<Event>,
    created_at: Instant,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBuffer {
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            offline: Vec::new(),
            created_at: Instant::now(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.live.push(event);
    }

    pub fn push_offline(&mut self, event: Event) {
        self.offline.push(event);
    }

    /// Puts events back ahead of everything already buffered.
    pub fn push_front(&mut self, mut events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        events.append(&mut self.live);
        self.live = events;
    }

    /// Moves the offline queue to the front of the live buffer.
    pub fn merge_offline(&mut self) -> usize {
        let offline = std::mem::take(&mut self.offline);
        let count = offline.len();
        self.push_front(offline);
        count
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn offline_len(&self) -> usize {
        self.offline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live plus offline events.
    pub fn total_len(&self) -> usize {
        self.live.len() + self.offline.len()
    }

    /// Time since the live buffer was last detached.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Detaches up to `max` of the oldest live events.
    pub fn take_batch(&mut self, max: usize) -> Vec<Event> {
        if self.live.len() <= max {
            return self.take_all();
        }
        let rest = self.live.split_off(max);
        self.created_at = Instant::now();
        std::mem::replace(&mut self.live, rest)
    }

    /// Detaches the whole live buffer.
    pub fn take_all(&mut self) -> Vec<Event> {
        self.created_at = Instant::now();
        std::mem::take(&mut self.live)
    }

    /// Drops everything, offline queue included.
    pub fn clear(&mut self) -> usize {
        let dropped = self.total_len();
        self.live.clear();
        self.offline.clear();
        self.created_at = Instant::now();
        dropped
    }
}
