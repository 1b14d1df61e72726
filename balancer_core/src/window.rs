//! Fixed-capacity moving-average window.

use std::collections::VecDeque;

use crate::error::BalanceError;

/// Number of samples averaged per axis.
pub const WINDOW_CAPACITY: usize = 5;

/// FIFO of the most recent samples; the oldest is evicted once full.
///
/// Capacity is fixed at construction. `average()` is the arithmetic mean of the
/// held samples truncated toward zero, computed in 128-bit so extreme inputs
/// cannot overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    buf: VecDeque<i64>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    /// Window holding up to `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: i64) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(sample);
    }

    pub fn average(&self) -> Result<i64, BalanceError> {
        if self.buf.is_empty() {
            return Err(BalanceError::Empty);
        }
        let sum: i128 = self.buf.iter().map(|&v| i128::from(v)).sum();
        // |mean| <= max |sample|, so the quotient always fits back into i64
        Ok((sum / self.buf.len() as i128) as i64)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.buf.iter().copied()
    }
}
