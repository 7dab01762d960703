//! Rolling mean over the most recent mass samples.
//!
//! `average()` on an empty window returns `None`; callers always insert
//! before averaging, so the pipeline never observes the empty case.

use std::collections::{HashMap, VecDeque};

/// Samples kept per crane in the field deployment.
pub const DEFAULT_WINDOW: usize = 15;

/// Bounded most-recent-first window.
#[derive(Debug, Clone)]
pub struct SmoothingBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SmoothingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Push to the front; evicts the oldest sample once over capacity.
    pub fn insert(&mut self, value: f64) {
        self.samples.push_front(value);
        if self.samples.len() > self.capacity {
            self.samples.pop_back();
        }
    }

    /// Arithmetic mean of the current contents, `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// One smoothing window per crane id, so interleaved devices never mix.
#[derive(Debug, Clone)]
pub struct SmoothingBank {
    windows: HashMap<u32, SmoothingBuffer>,
    capacity: usize,
}

impl Default for SmoothingBank {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SmoothingBank {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: HashMap::new(),
            capacity,
        }
    }

    /// Record `mass` for `crane_id` and return that crane's updated mean.
    pub fn observe(&mut self, crane_id: u32, mass: f64) -> f64 {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(crane_id)
            .or_insert_with(|| SmoothingBuffer::new(capacity));
        window.insert(mass);
        window.average().unwrap_or(mass)
    }

    pub fn window(&self, crane_id: u32) -> Option<&SmoothingBuffer> {
        self.windows.get(&crane_id)
    }

    /// Number of cranes seen so far.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_three() {
        let mut b = SmoothingBuffer::default();
        for v in [10.0, 20.0, 30.0] {
            b.insert(v);
        }
        assert_eq!(b.average(), Some(20.0));
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![30.0, 20.0, 10.0]);
    }

    #[test]
    fn sixteenth_sample_evicts_the_first() {
        let mut b = SmoothingBuffer::default();
        for v in 1..=16 {
            b.insert(f64::from(v));
        }
        assert_eq!(b.len(), 15);
        let expected = (2..=16).sum::<i32>() as f64 / 15.0;
        assert_eq!(b.average(), Some(expected));
        assert!(b.iter().all(|v| v >= 2.0));
    }

    #[test]
    fn empty_window_has_no_average() {
        let b = SmoothingBuffer::new(4);
        assert_eq!(b.average(), None);
        assert!(b.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut b = SmoothingBuffer::new(0);
        b.insert(1.0);
        b.insert(2.0);
        assert_eq!(b.capacity(), 1);
        assert_eq!(b.average(), Some(2.0));
    }

    #[test]
    fn bank_keeps_cranes_apart() {
        let mut bank = SmoothingBank::new(15);
        assert_eq!(bank.observe(3, 1.0), 1.0);
        assert_eq!(bank.observe(17, 9.0), 9.0);
        assert_eq!(bank.observe(3, 3.0), 2.0);
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.window(17).map(SmoothingBuffer::len), Some(1));
    }
}
