// Staging buffer: consumer-owned byte buffer that batches rendered records
// before they are handed to the mmap writer

use std::fmt::{self, Write};

/// Default staging capacity, several hundred times the largest expected
/// record rendering so the pre-record headroom check stays sound
pub const DEFAULT_CAPACITY: usize = 128 * 1024;

/// Fixed-capacity byte buffer with a write cursor.
///
/// Appends beyond capacity are truncated; this is documented lossy behavior,
/// guarded in practice by the consumer's headroom check before each record.
/// Owned by the single consumer thread, so no synchronization.
pub struct StagingBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl StagingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        StagingBuffer {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
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

    /// True when `needed` more bytes fit without truncation
    pub fn has_space(&self, needed: usize) -> bool {
        self.buf.len() + needed <= self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop the first `len` bytes after they have been written out,
    /// shifting any in-progress tail to the front
    pub fn consume(&mut self, len: usize) {
        self.buf.drain(..len);
    }

    /// Append bytes, truncating at capacity
    pub fn append(&mut self, bytes: &[u8]) {
        let room = self.capacity - self.buf.len();
        let take = bytes.len().min(room);
        self.buf.extend_from_slice(&bytes[..take]);
    }

    pub fn push(&mut self, byte: u8) {
        if self.buf.len() < self.capacity {
            self.buf.push(byte);
        }
    }

    /// Lossless base-10 integer conversion
    pub fn append_int(&mut self, value: i64) {
        let _ = write!(self, "{value}");
    }

    /// Render a double.
    ///
    /// `NaN` → `nan`, infinities → `inf`/`-inf`, zeros → `0`/`-0`; all other
    /// finite values use scientific form with four significant digits
    /// (`d.ddde±e` via `{:.3e}`).
    pub fn append_f64(&mut self, value: f64) {
        if value.is_nan() {
            self.append(b"nan");
        } else if value.is_infinite() {
            self.append(if value > 0.0 { b"inf" } else { b"-inf" });
        } else if value == 0.0 {
            self.append(if value.is_sign_negative() { b"-0" } else { b"0" });
        } else {
            let _ = write!(self, "{value:.3e}");
        }
    }
}

impl Write for StagingBuffer {
    // Truncating sink: reports success even when the tail was cut, per the
    // documented lossy contract
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}
