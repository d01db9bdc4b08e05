use std::collections::VecDeque;

/// Fixed-capacity FIFO of recently emitted items; the oldest entry is
/// evicted when a new one arrives at capacity.
#[derive(Debug)]
pub struct EventBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> EventBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn add(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Current contents in insertion order.
    pub fn get(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut buffer = EventBuffer::new(3);
        for n in 0..3 {
            buffer.add(n);
        }
        assert_eq!(buffer.get().copied().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut buffer = EventBuffer::new(3);
        for n in 0..5 {
            buffer.add(n);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.get().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }
}
