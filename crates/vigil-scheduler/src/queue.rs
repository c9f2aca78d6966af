//! Fire queue — a min-heap of pending occurrences.
//!
//! Replaces scan-every-tick scheduling: the engine sleeps until the
//! earliest entry and is woken early by commands. Exactly one entry per
//! enabled destination; an entry leaves the heap while its pipeline is in
//! flight and is reinserted on completion.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

/// One pending occurrence. Ordered by fire time, tie-broken by
/// destination id so pop order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub next_fire_at: DateTime<Utc>,
    pub destination_id: String,
}

impl Ord for ScheduleEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.next_fire_at
            .cmp(&other.next_fire_at)
            .then_with(|| self.destination_id.cmp(&other.destination_id))
    }
}

impl PartialOrd for ScheduleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of schedule entries, keyed by destination id.
#[derive(Debug, Default)]
pub struct FireQueue {
    heap: BinaryHeap<Reverse<ScheduleEntry>>,
}

impl FireQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any existing entry for the same
    /// destination. This is what keeps the one-entry-per-destination
    /// invariant.
    pub fn insert(&mut self, entry: ScheduleEntry) {
        self.remove(&entry.destination_id);
        self.heap.push(Reverse(entry));
    }

    /// Drop the entry for a destination, if present. Returns whether one
    /// was removed. O(n) rebuild; the queue is small.
    pub fn remove(&mut self, destination_id: &str) -> bool {
        let before = self.heap.len();
        let kept: BinaryHeap<_> = self
            .heap
            .drain()
            .filter(|Reverse(e)| e.destination_id != destination_id)
            .collect();
        self.heap = kept;
        self.heap.len() < before
    }

    /// Earliest pending fire time, if any.
    pub fn peek_deadline(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(e)| e.next_fire_at)
    }

    /// Pop every entry whose fire time has arrived.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        let mut due = Vec::new();
        while let Some(Reverse(e)) = self.heap.peek() {
            if e.next_fire_at > now {
                break;
            }
            if let Some(Reverse(e)) = self.heap.pop() {
                due.push(e);
            }
        }
        due
    }

    pub fn contains(&self, destination_id: &str) -> bool {
        self.heap
            .iter()
            .any(|Reverse(e)| e.destination_id == destination_id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// All entries in fire order. For status/inspection only.
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        let mut all: Vec<_> = self.heap.iter().map(|Reverse(e)| e.clone()).collect();
        all.sort();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, h: u32, m: u32) -> ScheduleEntry {
        ScheduleEntry {
            next_fire_at: Utc.with_ymd_and_hms(2026, 8, 30, h, m, 0).unwrap(),
            destination_id: id.to_string(),
        }
    }

    #[test]
    fn test_pop_due_in_time_order() {
        let mut q = FireQueue::new();
        q.insert(entry("b", 9, 0));
        q.insert(entry("a", 8, 0));
        q.insert(entry("c", 10, 0));

        let now = Utc.with_ymd_and_hms(2026, 8, 30, 9, 30, 0).unwrap();
        let due = q.pop_due(now);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].destination_id, "a");
        assert_eq!(due[1].destination_id, "b");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_tie_break_by_id() {
        let mut q = FireQueue::new();
        q.insert(entry("grp2", 8, 0));
        q.insert(entry("grp1", 8, 0));
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 8, 0, 0).unwrap();
        let due = q.pop_due(now);
        assert_eq!(due[0].destination_id, "grp1");
        assert_eq!(due[1].destination_id, "grp2");
    }

    #[test]
    fn test_insert_replaces_existing_entry() {
        let mut q = FireQueue::new();
        q.insert(entry("grp1", 8, 0));
        q.insert(entry("grp1", 9, 0));
        assert_eq!(q.len(), 1);
        assert_eq!(
            q.peek_deadline(),
            Some(Utc.with_ymd_and_hms(2026, 8, 30, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_remove() {
        let mut q = FireQueue::new();
        q.insert(entry("grp1", 8, 0));
        q.insert(entry("grp2", 9, 0));
        assert!(q.remove("grp1"));
        assert!(!q.remove("grp1"));
        assert!(!q.contains("grp1"));
        assert!(q.contains("grp2"));
    }

    #[test]
    fn test_empty_queue_has_no_deadline() {
        let q = FireQueue::new();
        assert!(q.peek_deadline().is_none());
        assert!(q.is_empty());
    }
}
