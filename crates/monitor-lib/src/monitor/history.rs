//! Fixed-capacity, newest-first history
//!
//! Eviction happens on insert, so the capacity bound holds after every call.

use std::collections::VecDeque;

/// Newest-first list that drops its oldest entries beyond `capacity`
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert as the newest entry
    pub fn push(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.evict();
    }

    /// Insert a batch ahead of existing entries, keeping the batch's order
    pub fn extend_front(&mut self, batch: Vec<T>) {
        for entry in batch.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.evict();
    }

    fn evict(&mut self) {
        self.entries.truncate(self.capacity);
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Contiguous newest-first view of the entries
    pub fn as_slice(&mut self) -> &[T] {
        self.entries.make_contiguous()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy of the entries, newest first
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }

    /// Copy of at most `limit` newest entries
    pub fn newest(&self, limit: usize) -> Vec<T> {
        self.entries.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut history = BoundedHistory::new(3);
        for i in 0..5 {
            history.push(i);
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), vec![4, 3, 2]);
    }

    #[test]
    fn test_extend_front_keeps_batch_order() {
        let mut history = BoundedHistory::new(4);
        history.push(1);
        history.push(2);
        history.extend_front(vec![10, 11, 12]);

        assert_eq!(history.to_vec(), vec![10, 11, 12, 2]);
    }

    #[test]
    fn test_newest_limit() {
        let mut history = BoundedHistory::new(10);
        for i in 0..6 {
            history.push(i);
        }

        assert_eq!(history.newest(2), vec![5, 4]);
        assert_eq!(history.newest(100).len(), 6);
        assert!(history.newest(0).is_empty());
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut history = BoundedHistory::new(0);
        history.push("x");
        assert!(history.is_empty());
    }
}
