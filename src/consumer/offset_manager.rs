//! Manual offset management

use super::handle::TopicPartitionOffset;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

type PartitionKey = (String, i32);

#[derive(Debug, Default)]
struct Offsets {
    /// Processed but not yet handed out for commit
    pending: HashMap<PartitionKey, i64>,
    /// Handed out for commit, outcome unknown
    in_flight: HashMap<PartitionKey, i64>,
    /// Acknowledged by the group coordinator
    committed: HashMap<PartitionKey, i64>,
}

impl Offsets {
    fn mark(&mut self, key: PartitionKey, offset: i64) -> bool {
        let floor = self
            .committed
            .get(&key)
            .into_iter()
            .chain(self.in_flight.get(&key))
            .max();
        if floor.is_some_and(|&floor| offset <= floor) {
            return false;
        }

        let entry = self.pending.entry(key).or_insert(offset);
        if offset > *entry {
            *entry = offset;
        }
        true
    }
}

/// Tracks processed offsets per partition through pending, in-flight and
/// committed.
///
/// Offsets are stored as the last *processed* offset; everything handed out
/// for committing is already advanced by one.
#[derive(Debug, Default)]
pub struct OffsetManager {
    offsets: Mutex<Offsets>,
}

impl OffsetManager {
    /// Create an empty offset manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an offset as processed. Offsets at or below one already marked,
    /// in flight or committed for the partition are ignored.
    pub fn mark(&self, topic: &str, partition: i32, offset: i64) {
        if self.offsets.lock().mark((topic.to_string(), partition), offset) {
            debug!(topic, partition, offset, "Marked offset for commit");
        }
    }

    /// Offsets to commit, one past the last processed record, sorted by
    /// topic and partition
    pub fn pending(&self) -> Vec<TopicPartitionOffset> {
        to_commit_offsets(self.offsets.lock().pending.iter())
    }

    /// Like [`pending`](Self::pending) but moves the offsets to in flight.
    /// Each must later be resolved with [`mark_committed`](Self::mark_committed)
    /// or [`restore`](Self::restore).
    pub fn take_pending(&self) -> Vec<TopicPartitionOffset> {
        let mut state = self.offsets.lock();
        let offsets = to_commit_offsets(state.pending.iter());
        for (key, offset) in std::mem::take(&mut state.pending) {
            let entry = state.in_flight.entry(key).or_insert(offset);
            if offset > *entry {
                *entry = offset;
            }
        }
        offsets
    }

    /// Put offsets back to pending after a failed commit. Newer marks win,
    /// and offsets superseded by a newer in-flight commit are dropped.
    pub fn restore(&self, offsets: &[TopicPartitionOffset]) {
        let mut state = self.offsets.lock();
        for tpo in offsets {
            let key = (tpo.topic.clone(), tpo.partition);
            let processed = tpo.offset - 1;
            match state.in_flight.get(&key).copied() {
                Some(newer) if newer > processed => continue,
                Some(_) => {
                    state.in_flight.remove(&key);
                }
                None => {}
            }
            state.mark(key, processed);
        }
    }

    /// Record that these commit offsets were acknowledged
    pub fn mark_committed(&self, offsets: &[TopicPartitionOffset]) {
        let mut state = self.offsets.lock();
        for tpo in offsets {
            let key = (tpo.topic.clone(), tpo.partition);
            let processed = tpo.offset - 1;
            let entry = state.committed.entry(key.clone()).or_insert(processed);
            if processed > *entry {
                *entry = processed;
            }
            let committed = *entry;

            if state.in_flight.get(&key).is_some_and(|&o| o <= committed) {
                state.in_flight.remove(&key);
            }
            if state.pending.get(&key).is_some_and(|&o| o <= committed) {
                state.pending.remove(&key);
            }
        }
    }

    /// Last committed processed offset for a partition
    pub fn committed(&self, topic: &str, partition: i32) -> Option<i64> {
        self.offsets
            .lock()
            .committed
            .get(&(topic.to_string(), partition))
            .copied()
    }

    /// Number of partitions with uncommitted progress
    pub fn pending_count(&self) -> usize {
        self.offsets.lock().pending.len()
    }

    /// Number of partitions with a commit awaiting its outcome
    pub fn in_flight_count(&self) -> usize {
        self.offsets.lock().in_flight.len()
    }

    /// Forget everything, e.g. after a rebalance
    pub fn reset(&self) {
        *self.offsets.lock() = Offsets::default();
    }
}

fn to_commit_offsets<'a>(
    entries: impl Iterator<Item = (&'a PartitionKey, &'a i64)>,
) -> Vec<TopicPartitionOffset> {
    let mut offsets: Vec<TopicPartitionOffset> = entries
        .map(|((topic, partition), offset)| {
            TopicPartitionOffset::new(topic.clone(), *partition, offset + 1)
        })
        .collect();
    offsets.sort();
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_offset_manager() {
        let manager = OffsetManager::new();

        manager.mark("test-topic", 1, 200);
        manager.mark("test-topic", 0, 100);

        assert_eq!(manager.pending_count(), 2);
        assert_eq!(
            manager.pending(),
            vec![
                TopicPartitionOffset::new("test-topic", 0, 101),
                TopicPartitionOffset::new("test-topic", 1, 201),
            ]
        );
    }

    #[test]
    fn marks_are_monotonic() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 10);
        manager.mark("t", 0, 7);
        assert_eq!(manager.pending(), vec![TopicPartitionOffset::new("t", 0, 11)]);
    }

    #[test]
    fn take_pending_clears() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 1);
        assert_eq!(manager.take_pending().len(), 1);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn committed_offsets_suppress_older_marks() {
        let manager = OffsetManager::new();
        manager.mark_committed(&[TopicPartitionOffset::new("t", 0, 6)]);

        assert_eq!(manager.committed("t", 0), Some(5));
        manager.mark("t", 0, 5);
        assert_eq!(manager.pending_count(), 0);
        manager.mark("t", 0, 6);
        assert_eq!(manager.pending(), vec![TopicPartitionOffset::new("t", 0, 7)]);
    }

    #[test]
    fn restore_keeps_newer_marks() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 3);
        let taken = manager.take_pending();
        manager.mark("t", 0, 8);
        manager.restore(&taken);
        assert_eq!(manager.pending(), vec![TopicPartitionOffset::new("t", 0, 9)]);
    }

    #[test]
    fn taken_offsets_are_in_flight_until_acknowledged() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 4);
        let taken = manager.take_pending();

        assert_eq!(manager.in_flight_count(), 1);
        assert_eq!(manager.committed("t", 0), None);

        manager.mark_committed(&taken);
        assert_eq!(manager.in_flight_count(), 0);
        assert_eq!(manager.committed("t", 0), Some(4));
    }

    #[test]
    fn failed_commit_superseded_by_newer_request_is_not_restored() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 4);
        let first = manager.take_pending();
        manager.mark("t", 0, 9);
        let second = manager.take_pending();

        manager.restore(&first);
        assert_eq!(manager.pending_count(), 0);

        manager.restore(&second);
        assert_eq!(manager.pending(), vec![TopicPartitionOffset::new("t", 0, 10)]);
    }

    #[test]
    fn acknowledgment_drops_older_restored_offsets() {
        let manager = OffsetManager::new();
        manager.mark("t", 0, 4);
        let first = manager.take_pending();
        manager.restore(&first);
        manager.mark_committed(&[TopicPartitionOffset::new("t", 0, 8)]);

        assert_eq!(manager.pending_count(), 0);
        assert_eq!(manager.committed("t", 0), Some(7));
    }
}
