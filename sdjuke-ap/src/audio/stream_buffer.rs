//! Compressed-stream buffer
//!
//! Fixed-capacity byte window over the currently open track file. The
//! decoder reads frames from the unread window, the controller advances the
//! window with `consume()` and tops it up with `refill()` whenever the
//! unread count drops below the low-water mark.
//!
//! Invariants:
//! - unread bytes are contiguous in `data[cursor..cursor + valid]`
//! - `cursor + valid <= capacity`
//! - once the reader has returned 0 bytes, it is never read again until
//!   `reset()`

use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use tracing::{trace, warn};

/// Default window size in bytes
pub const DEFAULT_STREAM_CAPACITY: usize = 8192;

/// Default low-water mark in bytes
pub const DEFAULT_LOW_WATER_MARK: usize = 1024;

/// Smallest accepted window: the largest Layer III frame (1441 bytes at
/// 320 kbit/s, 32 kHz, padded) plus one header lookahead, rounded up.
pub const MIN_STREAM_CAPACITY: usize = 2048;

/// Bounded byte window over a compressed audio stream
#[derive(Debug)]
pub struct CompressedStreamBuffer {
    data: Box<[u8]>,
    cursor: usize,
    valid: usize,
    low_water_mark: usize,
    eof: bool,
}

impl CompressedStreamBuffer {
    /// Create a buffer, validating the capacity assumptions.
    ///
    /// # Errors
    /// - `capacity < MIN_STREAM_CAPACITY`
    /// - `low_water_mark == 0` or `low_water_mark >= capacity`
    pub fn new(capacity: usize, low_water_mark: usize) -> Result<Self> {
        if capacity < MIN_STREAM_CAPACITY {
            return Err(Error::Config(format!(
                "stream buffer capacity {} is below the minimum of {} bytes",
                capacity, MIN_STREAM_CAPACITY
            )));
        }
        if low_water_mark == 0 || low_water_mark >= capacity {
            return Err(Error::Config(format!(
                "low-water mark {} must be between 1 and {} bytes",
                low_water_mark,
                capacity - 1
            )));
        }

        Ok(Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            cursor: 0,
            valid: 0,
            low_water_mark,
            eof: false,
        })
    }

    /// Forget all buffered bytes and the end-of-file latch (new track)
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.valid = 0;
        self.eof = false;
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn low_water_mark(&self) -> usize {
        self.low_water_mark
    }

    /// Unread byte count
    pub fn len(&self) -> usize {
        self.valid
    }

    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// Unread window, starting at the cursor
    pub fn unread(&self) -> &[u8] {
        &self.data[self.cursor..self.cursor + self.valid]
    }

    /// True once the reader has signalled end of file
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    /// End of file reached and every byte consumed
    pub fn is_exhausted(&self) -> bool {
        self.eof && self.valid == 0
    }

    /// Unread count below the low-water mark
    pub fn needs_refill(&self) -> bool {
        self.valid < self.low_water_mark
    }

    /// Advance the window by `n` bytes.
    ///
    /// A request beyond the unread count is clamped; that would mean the
    /// decoder reported more bytes than it was given.
    pub fn consume(&mut self, n: usize) {
        let n = if n > self.valid {
            warn!(
                "Consume of {} bytes exceeds {} unread bytes, clamping",
                n, self.valid
            );
            self.valid
        } else {
            n
        };

        self.cursor += n;
        self.valid -= n;
        if self.valid == 0 {
            self.cursor = 0;
        }
    }

    /// Move the unread tail to offset 0
    fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.data.copy_within(self.cursor..self.cursor + self.valid, 0);
        self.cursor = 0;
    }

    /// Compact, then read from `reader` until the buffer is full or the
    /// reader reports end of file.
    ///
    /// Returns the number of bytes loaded. After end of file has been seen
    /// the reader is not called again and `Ok(0)` is returned.
    ///
    /// # Errors
    /// A read error other than `Interrupted` latches end of file and is
    /// returned; bytes already buffered stay decodable.
    pub fn refill<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize> {
        if self.eof {
            return Ok(0);
        }

        self.compact();

        let mut loaded = 0;
        while self.valid < self.data.len() {
            let start = self.valid;
            match reader.read(&mut self.data[start..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    self.valid += n;
                    loaded += n;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.eof = true;
                    return Err(Error::Io(e));
                }
            }
        }

        trace!(
            loaded,
            unread = self.valid,
            eof = self.eof,
            "Refilled stream buffer"
        );
        Ok(loaded)
    }
}
