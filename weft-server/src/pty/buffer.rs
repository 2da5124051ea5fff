//! Byte-capped scrollback buffer.

use std::collections::VecDeque;

use bytes::Bytes;

/// Raw output chunks retained up to a byte cap. Whole chunks are evicted
/// oldest-first when the cap shrinks or is exceeded.
#[derive(Debug)]
pub struct ScrollbackBuffer {
    chunks: VecDeque<Bytes>,
    bytes: usize,
    max_bytes: usize,
}

impl ScrollbackBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            bytes: 0,
            max_bytes,
        }
    }

    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.bytes += chunk.len();
        self.chunks.push_back(chunk);
        self.evict();
    }

    /// Change the cap, evicting immediately if the buffer is now over.
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        self.max_bytes = max_bytes;
        self.evict();
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// All retained bytes, oldest first.
    pub fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes);
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }

    fn evict(&mut self) {
        while self.bytes > self.max_bytes {
            match self.chunks.pop_front() {
                Some(chunk) => self.bytes -= chunk.len(),
                None => break,
            }
        }
    }
}
