//! Fixed-capacity ring buffer with index-based eviction.
//!
//! Backs every bounded queue in the session core: the frame queue,
//! the latency/bandwidth sample windows and the input queue. Capacity
//! is fixed at construction, so `len() <= capacity()` holds by
//! construction rather than by caller discipline.

/// Fixed-capacity FIFO ring.
///
/// Slots are addressed logically from the oldest item (index `0`) to
/// the newest (index `len - 1`).
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    /// Physical index of the oldest item.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create an empty ring holding at most `capacity` items.
    ///
    /// A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let slots = (0..capacity).map(|_| None).collect::<Vec<_>>();
        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append at the tail. When full, the oldest item is evicted and
    /// returned.
    pub fn push_back(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() { self.pop_front() } else { None };
        let tail = self.physical(self.len);
        self.slots[tail] = Some(item);
        self.len += 1;
        evicted
    }

    /// Remove and return the oldest item.
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        item
    }

    /// Item at logical `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[self.physical(index)].as_ref()
    }

    /// Remove the item at logical `index`, shifting newer items one
    /// slot toward the head so arrival order is preserved.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        let item = self.slots[self.physical(index)].take();
        for i in index..self.len - 1 {
            let next = self.slots[self.physical(i + 1)].take();
            let here = self.physical(i);
            self.slots[here] = next;
        }
        self.len -= 1;
        item
    }

    /// Logical index of the first item matching `pred`, oldest first.
    pub fn position<F>(&self, mut pred: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.iter().position(|item| pred(item))
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Take every item out, oldest → newest, leaving the ring empty.
    pub fn drain(&mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        while let Some(item) = self.pop_front() {
            out.push(item);
        }
        out
    }

    pub fn clear(&mut self) {
        self.drain();
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.capacity()
    }
}

// ── SampleWindow ─────────────────────────────────────────────────

/// Sliding window of numeric samples with an O(1) running mean.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    ring: RingBuffer<f64>,
    sum: f64,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RingBuffer::with_capacity(capacity),
            sum: 0.0,
        }
    }

    /// Add a sample, evicting the oldest when the window is full.
    pub fn record(&mut self, sample: f64) {
        if let Some(evicted) = self.ring.push_back(sample) {
            self.sum -= evicted;
        }
        self.sum += sample;
    }

    /// Mean of the samples in the window, `None` when empty.
    pub fn mean(&self) -> Option<f64> {
        if self.ring.is_empty() {
            None
        } else {
            Some(self.sum / self.ring.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_within_capacity() {
        let mut ring = RingBuffer::with_capacity(3);
        assert_eq!(ring.push_back(1), None);
        assert_eq!(ring.push_back(2), None);
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.get(0), Some(&1));
        assert_eq!(ring.get(1), Some(&2));
        assert_eq!(ring.get(2), None);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut ring = RingBuffer::with_capacity(2);
        ring.push_back('a');
        ring.push_back('b');
        assert_eq!(ring.push_back('c'), Some('a'));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec!['b', 'c']);
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut ring = RingBuffer::with_capacity(4);
        for i in 0..100 {
            ring.push_back(i);
            assert!(ring.len() <= ring.capacity());
        }
        assert_eq!(ring.drain(), vec![96, 97, 98, 99]);
        assert!(ring.is_empty());
    }

    #[test]
    fn remove_preserves_order_across_wrap() {
        let mut ring = RingBuffer::with_capacity(4);
        for i in 0..6 {
            ring.push_back(i);
        }
        // Physical layout has wrapped; logical order is 2, 3, 4, 5.
        assert_eq!(ring.remove(1), Some(3));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 4, 5]);
        ring.push_back(6);
        ring.push_back(7);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn remove_out_of_range() {
        let mut ring: RingBuffer<u8> = RingBuffer::with_capacity(2);
        assert_eq!(ring.remove(0), None);
        ring.push_back(9);
        assert_eq!(ring.remove(1), None);
    }

    #[test]
    fn position_finds_oldest_match() {
        let mut ring = RingBuffer::with_capacity(5);
        for i in [1, 4, 6, 8] {
            ring.push_back(i);
        }
        assert_eq!(ring.position(|v| v % 2 == 0), Some(1));
        assert_eq!(ring.position(|v| *v > 100), None);
    }

    #[test]
    fn zero_capacity_is_bumped() {
        let mut ring = RingBuffer::with_capacity(0);
        assert_eq!(ring.capacity(), 1);
        ring.push_back(1);
        assert_eq!(ring.push_back(2), Some(1));
    }

    #[test]
    fn sample_window_mean_tracks_eviction() {
        let mut window = SampleWindow::new(3);
        assert_eq!(window.mean(), None);
        for s in [10.0, 20.0, 30.0] {
            window.record(s);
        }
        assert_eq!(window.mean(), Some(20.0));
        window.record(90.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), Some(140.0 / 3.0));
    }
}
