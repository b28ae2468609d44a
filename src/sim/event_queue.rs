//! Event queue with deterministic ordering.

use super::SimTime;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Key for ordering events in the queue.
///
/// Events are ordered by time, then by sequence number, so events scheduled
/// for the same instant fire in the order they were scheduled.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct EventKey {
    pub time: SimTime,
    pub sequence: u64,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.sequence.cmp(&other.sequence)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-threaded timer facility: "schedule E at T" and "what time is it".
///
/// Scheduled events are never cancelled; every entry fires once.
#[derive(Debug)]
pub struct Scheduler<E> {
    now: SimTime,
    sequence: u64,
    queue: BTreeMap<EventKey, E>,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            sequence: 0,
            queue: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `event` to fire `delay` after the current time.
    pub fn schedule(&mut self, delay: SimTime, event: E) -> EventKey {
        self.schedule_at(self.now + delay, event)
    }

    /// Schedule `event` at an absolute time. Times in the past are clamped to now.
    pub fn schedule_at(&mut self, time: SimTime, event: E) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time: time.max(self.now),
            sequence: self.sequence,
        };
        self.queue.insert(key, event);
        key
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.first_key_value().map(|(key, _)| key.time)
    }

    /// Pop the next event and advance the clock to its time.
    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        let (key, event) = self.queue.pop_first()?;
        self.now = key.time;
        Some((key.time, event))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
