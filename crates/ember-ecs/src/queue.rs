/// Per-frame buffer of pending structural changes.
///
/// Items are appended during the frame and drained by index at the tick
/// boundary, so anything pushed while a drain is running is still seen by
/// that drain. [`consume`](Self::consume) then drops exactly the processed
/// prefix, keeping the allocation.
#[derive(Debug)]
pub(crate) struct FrameQueue<T> {
    items: Vec<T>,
}

impl<T: Copy> FrameQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.items.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop the first `processed` items.
    pub fn consume(&mut self, processed: usize) {
        let processed = processed.min(self.items.len());
        self.items.drain(..processed);
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_keeps_late_arrivals() {
        let mut queue = FrameQueue::with_capacity(8);
        queue.push(1);
        queue.push(2);
        queue.push(3);
        queue.consume(2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(0), Some(3));
    }

    #[test]
    fn capacity_survives_reset() {
        let mut queue = FrameQueue::with_capacity(16);
        for i in 0..10 {
            queue.push(i);
        }
        queue.consume(queue.len());
        assert!(queue.is_empty());
        assert!(queue.capacity() >= 16);
    }
}
