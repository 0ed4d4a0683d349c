//! # Ring Buffer
//!
//! Fixed-capacity circular history used by the state estimator for short
//! aggregates (last two run times, a gyro calibration window, ...).
//!
//! Logical index `0` is the most recently appended element, index `i` the
//! `i`-th most recent. Once the buffer is full, appending overwrites the
//! oldest element.
//!
//! ## Usage
//!
//! ```
//! use nxt_telemetry::ring_buffer::RingBuffer;
//!
//! let mut rb = RingBuffer::new(3);
//! for v in [1.0, 2.0, 3.0, 4.0] {
//!     rb.append(v);
//! }
//!
//! assert_eq!(rb.len(), 3);
//! assert_eq!(rb[0], 4.0);
//! assert_eq!(rb[2], 2.0);
//! assert_eq!(rb.average(), Some(3.0));
//! ```

use std::ops::{Index, IndexMut};

/// Fixed-capacity circular buffer with overwrite-oldest semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    /// Backing storage, grows up to `capacity` and is then reused in place.
    data: Vec<T>,
    /// Physical slot of the most recent element.
    head: usize,
    /// Logical capacity.
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` elements.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Appends a value, overwriting the oldest element once full.
    pub fn append(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
            self.head = self.data.len() - 1;
        } else {
            self.head = (self.head + 1) % self.capacity;
            self.data[self.head] = value;
        }
    }

    /// Number of elements currently held (saturates at the capacity).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Logical capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once `capacity` elements have been appended.
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Returns the `i`-th most recent element, or `None` if `i >= len()`.
    pub fn get(&self, i: usize) -> Option<&T> {
        self.slot(i).map(|slot| &self.data[slot])
    }

    /// Mutable variant of [`RingBuffer::get`].
    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        match self.slot(i) {
            Some(slot) => Some(&mut self.data[slot]),
            None => None,
        }
    }

    /// Iterates from the most recent element to the oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).map(move |i| &self[i])
    }

    /// Drops every element, keeping the capacity.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    fn slot(&self, i: usize) -> Option<usize> {
        if i >= self.data.len() {
            return None;
        }
        Some((self.head + self.capacity - i) % self.capacity)
    }
}

impl<T: Copy + Into<f64>> RingBuffer<T> {
    /// Mean of the elements currently held, `None` when empty.
    ///
    /// Only appended elements contribute; unused capacity is ignored.
    pub fn average(&self) -> Option<f64> {
        if self.data.is_empty() {
            return None;
        }
        let sum: f64 = self.data.iter().map(|&v| v.into()).sum();
        Some(sum / self.data.len() as f64)
    }
}

impl<T> Index<usize> for RingBuffer<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        match self.slot(i) {
            Some(slot) => &self.data[slot],
            None => panic!("ring buffer index {} out of range (len {})", i, self.len()),
        }
    }
}

impl<T> IndexMut<usize> for RingBuffer<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        let len = self.len();
        match self.slot(i) {
            Some(slot) => &mut self.data[slot],
            None => panic!("ring buffer index {} out of range (len {})", i, len),
        }
    }
}
