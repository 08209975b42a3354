//! Bucketed priority queue over label indices
//!
//! Sort costs are quantized into buckets of `bucket_size`. A window of
//! `bucket_count` consecutive buckets is scanned in ascending order; entries
//! beyond the window wait in an overflow list until the window drains and is
//! re-based at the cheapest overflow key. Entries keep their exact sort cost
//! and the cheapest one of the current bucket comes out first, so extraction
//! order is exact whatever the bucket width. Ties come out first in, first
//! out.
//!
//! The scan position never moves backwards. An insertion below it means a
//! negative cost or an inconsistent heuristic and is refused, except for a
//! float tolerance that is clamped into the current bucket.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    #[error("sort cost {sort_cost} is below the scan position {floor}")]
    BehindCursor { sort_cost: f32, floor: f32 },

    #[error("sort cost {0} is not a finite non-negative number")]
    InvalidSortCost(f32),

    #[error("label {0} is not queued")]
    NotQueued(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    label: u32,
    sort_cost: f32,
}

#[derive(Debug, Clone)]
pub struct BucketQueue {
    bucket_size: f32,
    buckets: Vec<Vec<Entry>>,
    /// Absolute key of `buckets[0]`
    base: u64,
    /// Scan position within the window
    cursor: usize,
    overflow: Vec<(Entry, u64)>,
    len: usize,
}

impl BucketQueue {
    pub fn new(bucket_size: f32, bucket_count: usize) -> Self {
        Self {
            bucket_size,
            buckets: vec![Vec::new(); bucket_count.max(1)],
            base: 0,
            cursor: 0,
            overflow: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_size(&self) -> f32 {
        self.bucket_size
    }

    fn current_key(&self) -> u64 {
        self.base + self.cursor as u64
    }

    /// Absolute bucket key of a sort cost, clamped up to the scan position
    /// when it falls just short of it
    fn key_of(&self, sort_cost: f32) -> Result<u64, QueueError> {
        if !sort_cost.is_finite() || sort_cost < 0.0 {
            return Err(QueueError::InvalidSortCost(sort_cost));
        }
        let key = (sort_cost / self.bucket_size).floor() as u64;
        let current = self.current_key();
        if key >= current {
            return Ok(key);
        }
        let floor = current as f32 * self.bucket_size;
        let tolerance = 1e-4 * sort_cost.max(1.0);
        if sort_cost + tolerance >= floor {
            Ok(current)
        } else {
            Err(QueueError::BehindCursor { sort_cost, floor })
        }
    }

    pub fn push(&mut self, label: u32, sort_cost: f32) -> Result<(), QueueError> {
        let key = self.key_of(sort_cost)?;
        self.place(Entry { label, sort_cost }, key);
        self.len += 1;
        Ok(())
    }

    fn place(&mut self, entry: Entry, key: u64) {
        let slot = key - self.base;
        if slot < self.buckets.len() as u64 {
            self.buckets[slot as usize].push(entry);
        } else {
            self.overflow.push((entry, key));
        }
    }

    /// Move a queued label from `old_sort` to the lower `new_sort`
    pub fn decrease(&mut self, label: u32, old_sort: f32, new_sort: f32) -> Result<(), QueueError> {
        let new_key = self.key_of(new_sort)?;
        // A queued entry sits at or after the scan position, so an old key
        // below it was clamped to it on insertion.
        let old_key = ((old_sort.max(0.0) / self.bucket_size).floor() as u64).max(self.current_key());
        self.remove(label, old_key)?;
        self.place(
            Entry {
                label,
                sort_cost: new_sort,
            },
            new_key,
        );
        Ok(())
    }

    fn remove(&mut self, label: u32, key: u64) -> Result<(), QueueError> {
        let slot = key - self.base;
        if slot < self.buckets.len() as u64 {
            let bucket = &mut self.buckets[slot as usize];
            let pos = bucket
                .iter()
                .position(|e| e.label == label)
                .ok_or(QueueError::NotQueued(label))?;
            bucket.remove(pos);
        } else {
            let pos = self
                .overflow
                .iter()
                .position(|(e, _)| e.label == label)
                .ok_or(QueueError::NotQueued(label))?;
            self.overflow.swap_remove(pos);
        }
        Ok(())
    }

    /// Advance the scan position to the first non-empty bucket, re-basing
    /// the window on the overflow when needed. False when the queue is empty.
    fn settle_cursor(&mut self) -> bool {
        let start = self.cursor;
        loop {
            while self.cursor < self.buckets.len() && self.buckets[self.cursor].is_empty() {
                self.cursor += 1;
            }
            if self.cursor < self.buckets.len() {
                return true;
            }
            let Some(min_key) = self.overflow.iter().map(|&(_, k)| k).min() else {
                // Empty: stay where the last entry came out
                self.cursor = start.min(self.buckets.len() - 1);
                return false;
            };
            self.base = min_key;
            self.cursor = 0;
            let window = self.buckets.len() as u64;
            let pending = std::mem::take(&mut self.overflow);
            for (entry, key) in pending {
                if key - self.base < window {
                    self.buckets[(key - self.base) as usize].push(entry);
                } else {
                    self.overflow.push((entry, key));
                }
            }
        }
    }

    /// Position of the cheapest entry in the current bucket, earliest on ties
    fn cheapest(&mut self) -> Option<usize> {
        if !self.settle_cursor() {
            return None;
        }
        let bucket = &self.buckets[self.cursor];
        let mut best = 0;
        for (i, entry) in bucket.iter().enumerate().skip(1) {
            if entry.sort_cost < bucket[best].sort_cost {
                best = i;
            }
        }
        Some(best)
    }

    /// Cheapest entry without taking it out: `(label, sort_cost)`
    pub fn peek(&mut self) -> Option<(u32, f32)> {
        let pos = self.cheapest()?;
        let entry = self.buckets[self.cursor][pos];
        Some((entry.label, entry.sort_cost))
    }

    pub fn pop(&mut self) -> Option<u32> {
        let pos = self.cheapest()?;
        let entry = self.buckets[self.cursor].remove(pos);
        self.len -= 1;
        Some(entry.label)
    }

    /// Sort cost of the next entry to come out
    pub fn peek_key(&mut self) -> Option<f32> {
        self.peek().map(|(_, sort_cost)| sort_cost)
    }

    pub fn clear(&mut self) {
        for b in &mut self.buckets {
            b.clear();
        }
        self.overflow.clear();
        self.base = 0;
        self.cursor = 0;
        self.len = 0;
    }
}
