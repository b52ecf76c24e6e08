//! Per-connection line framing over a byte stream
//!
//! Bytes arrive from the socket in arbitrary chunks. The framer queues them
//! and splits out `\r\n`-terminated lines on demand, without the terminator.
//! Line content is never interpreted here.
//!
//! A line longer than the capacity is reported once, in stream order, as a
//! [`FramerError::BufferOverflow`]. Its remaining bytes are then dropped up to
//! and including the next terminator, so no part of a rejected line is ever
//! handed out as a line of its own.

use crate::TERMINATOR;
use std::mem;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramerError {
    #[error("buffer overflow: line exceeds capacity {capacity}")]
    BufferOverflow { capacity: usize },
}

/// Bounded line splitter for one connection's input
#[derive(Debug, Clone)]
pub struct LineFramer {
    /// Received bytes not yet examined
    input: Vec<u8>,
    cursor: usize,
    /// The line being assembled
    line: Vec<u8>,
    capacity: usize,
    /// Dropping the tail of an overlong line
    discarding: bool,
    /// Last dropped byte was `\r`
    dropped_cr: bool,
}

impl LineFramer {
    /// Creates an empty framer whose lines may be at most `capacity` bytes,
    /// terminator included
    pub fn new(capacity: usize) -> Self {
        Self {
            input: Vec::new(),
            cursor: 0,
            line: Vec::with_capacity(capacity),
            capacity,
            discarding: false,
            dropped_cr: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the limit for lines not yet taken. Bytes already received are kept.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Number of received bytes not yet handed out or dropped
    pub fn buffered(&self) -> usize {
        self.input.len() - self.cursor + self.line.len()
    }

    /// True while the tail of an overlong line is being dropped
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Queues received bytes for framing
    pub fn feed(&mut self, bytes: &[u8]) {
        if self.cursor > 0 {
            self.input.drain(..self.cursor);
            self.cursor = 0;
        }
        self.input.extend_from_slice(bytes);
    }

    /// Returns the next complete line, excluding the terminator
    ///
    /// `Some(Err(BufferOverflow))` stands for one rejected line. `None` means
    /// no complete line has arrived yet.
    pub fn take_line(&mut self) -> Option<Result<Vec<u8>, FramerError>> {
        while let Some(&byte) = self.input.get(self.cursor) {
            self.cursor += 1;

            if self.discarding {
                if self.dropped_cr && byte == b'\n' {
                    self.discarding = false;
                }
                self.dropped_cr = byte == b'\r';
                continue;
            }

            self.line.push(byte);
            if self.line.ends_with(TERMINATOR) {
                self.line.truncate(self.line.len() - TERMINATOR.len());
                return Some(Ok(mem::take(&mut self.line)));
            }
            if self.line.len() >= self.capacity {
                self.discarding = true;
                self.dropped_cr = byte == b'\r';
                self.line.clear();
                return Some(Err(FramerError::BufferOverflow {
                    capacity: self.capacity,
                }));
            }
        }

        self.input.clear();
        self.cursor = 0;
        None
    }
}
