// src/slot/buffer.rs

use std::collections::VecDeque;

/// Bounded FIFO of output chunks.
///
/// Pushing into a full buffer evicts the oldest chunk first, so the buffer
/// always holds the newest `capacity` chunks.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    chunks: VecDeque<String>,
    capacity: usize,
    evicted: u64,
}

impl OutputBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            chunks: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            evicted: 0,
        }
    }

    pub fn push(&mut self, chunk: impl Into<String>) {
        while self.chunks.len() >= self.capacity {
            self.chunks.pop_front();
            self.evicted += 1;
        }
        self.chunks.push_back(chunk.into());
    }

    /// Remove every chunk and return them concatenated in insertion order.
    pub fn drain(&mut self) -> String {
        let mut out = String::with_capacity(self.chunks.iter().map(String::len).sum());
        for chunk in self.chunks.drain(..) {
            out.push_str(&chunk);
        }
        out
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of chunks dropped on overflow since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }
}
