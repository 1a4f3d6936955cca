// Lock-free MPSC ring buffer of log records
//
// Producers reserve a sequence number by CAS on the write cursor, construct
// the record in place, then publish by storing the sequence number into the
// slot's own atomic. The consumer only ever observes the maximal contiguous
// published prefix, so a reserved-but-unwritten slot can never be read.

use crate::config::ConfigError;
use crate::record::LogRecord;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache-aligned wrapper to prevent false sharing
#[repr(align(64))]
pub(crate) struct CacheAligned<T>(pub(crate) T);

/// The ring had no free slot; the record was not enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull;

impl std::fmt::Display for QueueFull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "log ring is full")
    }
}

impl std::error::Error for QueueFull {}

/// Lock-free multiple-producer single-consumer ring buffer
///
/// Fixed capacity (a power of two), fixed-size slots. Producers never block:
/// a push against a full ring fails with [`QueueFull`] and the record is
/// dropped by the caller. Exactly one thread may drain.
pub struct MpscRing {
    slots: Box<[UnsafeCell<MaybeUninit<LogRecord>>]>,
    /// Publication handshake: slot `i` holds sequence `s` once the record
    /// for `s` is fully written; it starts at `i - capacity` so no slot
    /// appears published
    slot_sequences: Box<[AtomicU64]>,
    capacity: u64,
    mask: u64,
    write_cursor: CacheAligned<AtomicU64>,
    read_cursor: CacheAligned<AtomicU64>,
}

// SAFETY: MpscRing is Sync because:
// - Producers coordinate slot ownership via CAS on write_cursor
// - The per-slot sequence store (Release) is paired with the consumer's
//   Acquire load, so records are fully visible before they are observable
// - Only one thread drains (documented single-consumer contract)
unsafe impl Send for MpscRing {}
unsafe impl Sync for MpscRing {}

impl MpscRing {
    /// Create a ring with the given capacity (records).
    ///
    /// The capacity must be a nonzero power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::CapacityZero);
        }
        if !capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(capacity));
        }

        let slots: Box<[UnsafeCell<MaybeUninit<LogRecord>>]> = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        let slot_sequences: Box<[AtomicU64]> = (0..capacity)
            .map(|i| AtomicU64::new((i as u64).wrapping_sub(capacity as u64)))
            .collect();

        Ok(MpscRing {
            slots,
            slot_sequences,
            capacity: capacity as u64,
            mask: capacity as u64 - 1,
            write_cursor: CacheAligned(AtomicU64::new(0)),
            read_cursor: CacheAligned(AtomicU64::new(0)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Enqueue a record (lock-free, any number of producers).
    ///
    /// Fails with [`QueueFull`] when `write − read == capacity`; the ring
    /// state is unchanged in that case and the caller is free to drop the
    /// record. Never blocks.
    pub fn try_push(&self, record: LogRecord) -> Result<(), QueueFull> {
        let seq = loop {
            let write = self.write_cursor.0.load(Ordering::Relaxed);
            let read = self.read_cursor.0.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= self.capacity {
                return Err(QueueFull);
            }
            match self.write_cursor.0.compare_exchange_weak(
                write,
                write + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break write,
                Err(_) => std::hint::spin_loop(),
            }
        };

        let idx = (seq & self.mask) as usize;
        // SAFETY: the CAS above made this thread the unique owner of
        // sequence `seq`; the consumer cannot read the slot until the
        // sequence store below, and producers cannot reuse it until the
        // consumer has advanced read_cursor past `seq`.
        unsafe {
            (*self.slots[idx].get()).write(record);
        }
        self.slot_sequences[idx].store(seq, Ordering::Release);
        Ok(())
    }

    /// Take a read view over the maximal contiguous published prefix.
    ///
    /// The view bounds itself with a snapshot of the write cursor, so a slot
    /// that was reserved but not yet published ends the scan without being
    /// read. Dropping the view advances the read cursor, releasing the slots
    /// for reuse.
    ///
    /// Only one thread may drain; concurrent drains are not supported.
    pub fn drain(&self) -> DrainView<'_> {
        let begin = self.read_cursor.0.load(Ordering::Relaxed);
        let limit = self.write_cursor.0.load(Ordering::Acquire);

        let mut end = begin;
        while end < limit
            && self.slot_sequences[(end & self.mask) as usize].load(Ordering::Acquire) == end
        {
            end += 1;
        }

        DrainView {
            ring: self,
            begin,
            end,
        }
    }

    /// Number of records currently in flight (approximate under concurrency)
    pub fn len(&self) -> usize {
        let write = self.write_cursor.0.load(Ordering::Relaxed);
        let read = self.read_cursor.0.load(Ordering::Relaxed);
        write.wrapping_sub(read).min(self.capacity) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable window over a contiguous run of published records.
///
/// Slots in `[begin, end)` stay owned by the consumer until the view is
/// dropped; the drop releases them back to the producers.
pub struct DrainView<'a> {
    ring: &'a MpscRing,
    begin: u64,
    end: u64,
}

impl<'a> DrainView<'a> {
    pub fn len(&self) -> usize {
        (self.end - self.begin) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn iter(&self) -> Records<'_> {
        Records {
            view: self,
            seq: self.begin,
        }
    }
}

impl<'a> Drop for DrainView<'a> {
    fn drop(&mut self) {
        // Slots in [begin, end) are now reusable by producers
        self.ring.read_cursor.0.store(self.end, Ordering::Release);
    }
}

impl<'v, 'a> IntoIterator for &'v DrainView<'a> {
    type Item = &'v LogRecord;
    type IntoIter = Records<'v>;

    fn into_iter(self) -> Records<'v> {
        self.iter()
    }
}

/// Iterator over the records of a [`DrainView`]
pub struct Records<'v> {
    view: &'v DrainView<'v>,
    seq: u64,
}

impl<'v> Iterator for Records<'v> {
    type Item = &'v LogRecord;

    fn next(&mut self) -> Option<&'v LogRecord> {
        if self.seq == self.view.end {
            return None;
        }
        let ring = self.view.ring;
        let idx = (self.seq & ring.mask) as usize;
        // SAFETY: [begin, end) was published with Release stores matched by
        // the Acquire loads in drain(), so every slot in the range holds a
        // fully initialized record; read_cursor has not advanced past the
        // range while the view is alive, so producers cannot overwrite it.
        let record = unsafe { (*ring.slots[idx].get()).assume_init_ref() };
        self.seq += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.view.end - self.seq) as usize;
        (remaining, Some(remaining))
    }
}
