//! Replay memory as a ring buffer.
use super::ReplayMemoryConfig;
use crate::{error::GridRlError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// A bounded, insertion-ordered memory of experiences.
///
/// Once `capacity` items are stored, each push evicts the oldest one.
pub struct ReplayMemory<T> {
    capacity: usize,
    /// Slot written by the next push.
    i: usize,
    items: Vec<T>,
    rng: StdRng,
}

impl<T> ReplayMemory<T> {
    /// Creates an empty memory.
    pub fn new(config: &ReplayMemoryConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(GridRlError::InvalidConfig("replay capacity is 0".into()).into());
        }
        Ok(Self {
            capacity: config.capacity,
            i: 0,
            items: Vec::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Maximum number of stored items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The oldest retained item.
    pub fn oldest(&self) -> Option<&T> {
        if self.items.len() < self.capacity {
            self.items.first()
        } else {
            self.items.get(self.i)
        }
    }

    /// Items from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = if self.items.len() < self.capacity {
            self.items.split_at(self.items.len())
        } else {
            self.items.split_at(self.i)
        };
        older.iter().chain(newer.iter())
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
        self.i = 0;
    }
}

impl<T> ExperienceBufferBase for ReplayMemory<T> {
    type Item = T;

    fn push(&mut self, tr: T) {
        if self.items.len() < self.capacity {
            self.items.push(tr);
        } else {
            self.items[self.i] = tr;
        }
        self.i = (self.i + 1) % self.capacity;
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: Clone> ReplayBufferBase for ReplayMemory<T> {
    type Config = ReplayMemoryConfig;
    type Batch = Vec<T>;

    fn build(config: &Self::Config) -> Result<Self> {
        Self::new(config)
    }

    /// Samples `size` distinct items uniformly at random.
    fn batch(&mut self, size: usize) -> Option<Self::Batch> {
        if size == 0 || self.items.len() < size {
            return None;
        }
        let ixs = index::sample(&mut self.rng, self.items.len(), size);
        Some(ixs.iter().map(|ix| self.items[ix].clone()).collect())
    }
}
