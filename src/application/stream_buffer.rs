// Stream buffer - Capacity-bounded live series, oldest points evicted first
use crate::domain::point::{Point, Series};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// Sole owner of the live series. Readers only ever see snapshots.
pub struct StreamBuffer {
    capacity: usize,
    points: RwLock<VecDeque<Point>>,
    appended: AtomicU64,
}

impl StreamBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: RwLock::new(VecDeque::with_capacity(capacity)),
            appended: AtomicU64::new(0),
        }
    }

    /// Buffer pre-filled with an initial batch, keeping only the newest `capacity` points.
    pub fn seeded(capacity: usize, initial: Series) -> Self {
        let buffer = Self::new(capacity);
        {
            let mut points = buffer.points.write();
            let skip = initial.len().saturating_sub(buffer.capacity);
            points.extend(initial.into_iter().skip(skip));
            buffer.appended.store(points.len() as u64, Ordering::Release);
        }
        buffer
    }

    pub fn append(&self, point: Point) {
        let mut points = self.points.write();
        while points.len() >= self.capacity {
            points.pop_front();
        }
        points.push_back(point);
        self.appended.fetch_add(1, Ordering::Release);
    }

    /// Points appended over the buffer's lifetime; changes whenever the contents do.
    pub fn version(&self) -> u64 {
        self.appended.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Series {
        self.points.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
