//! FIFO bucket used by the level propagator.
//!
//! A node can move between buckets while queued. Rather than searching a deque
//! to unlink it, the bucket only counts how many of its entries are still live;
//! the owner skips entries that no longer belong to the bucket when popping.

use std::collections::VecDeque;

/// A FIFO of queued nodes for one level.
#[derive(Debug)]
pub struct LightQueue<N> {
    entries: VecDeque<N>,
    live: usize,
}

impl<N> LightQueue<N> {
    /// Creates a new empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            live: 0,
        }
    }

    /// Appends a node that now belongs to this bucket.
    #[inline]
    pub fn enqueue(&mut self, node: N) {
        self.entries.push_back(node);
        self.live += 1;
    }

    /// Pops the oldest entry, live or stale.
    ///
    /// The caller decides whether the entry still belongs here and calls
    /// [`Self::release`] if it does.
    #[inline]
    pub fn dequeue_raw(&mut self) -> Option<N> {
        self.entries.pop_front()
    }

    /// Marks one live entry as gone. Stale entries are dropped once nothing live remains.
    #[inline]
    pub fn release(&mut self) {
        debug_assert!(self.live > 0, "released an empty light queue");
        self.live = self.live.saturating_sub(1);
        if self.live == 0 {
            self.entries.clear();
        }
    }

    /// Whether no live entries remain.
    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Returns the number of live entries in the queue.
    #[must_use]
    #[inline]
    pub const fn len(&self) -> usize {
        self.live
    }

    /// Clears all entries from the queue.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
    }
}

impl<N> Default for LightQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_dequeue() {
        let mut queue = LightQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);

        assert_eq!(queue.len(), 2);
        assert!(!queue.is_empty());

        assert_eq!(queue.dequeue_raw().unwrap(), 1);
        queue.release();
        assert_eq!(queue.dequeue_raw().unwrap(), 2);
        queue.release();

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_release_drops_stale_entries() {
        let mut queue = LightQueue::new();
        queue.enqueue('a');
        queue.enqueue('b');
        queue.enqueue('c');

        // 'a' and 'b' moved to another bucket
        queue.release();
        queue.release();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue_raw(), Some('a'));

        queue.release();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue_raw(), None);
    }

    #[test]
    fn test_clear() {
        let mut queue = LightQueue::new();
        queue.enqueue(10);
        queue.enqueue(5);

        assert_eq!(queue.len(), 2);
        queue.clear();
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }
}
