// Logger: the producer-side handle

use crate::level::Level;
use crate::record::{LogArg, LogRecord};
use crate::ring::MpscRing;
use std::sync::Arc;

/// Lightweight producer handle for one ring.
///
/// Cloneable and cheap to pass around; any number of threads may log through
/// their own clones concurrently. `MIN_LEVEL` is the compile-time threshold:
/// calls below it are resolved to nothing at compile time (the macros skip
/// argument evaluation entirely).
pub struct Logger<const MIN_LEVEL: u8 = 0> {
    ring: Arc<MpscRing>,
}

impl<const MIN_LEVEL: u8> Logger<MIN_LEVEL> {
    pub fn new(ring: Arc<MpscRing>) -> Self {
        Logger { ring }
    }

    /// Whether `level` passes the compile-time threshold.
    ///
    /// Const-foldable: the macros test this before evaluating arguments, so
    /// a filtered call constructs no record and reserves no slot.
    #[inline(always)]
    pub const fn enabled(&self, level: Level) -> bool {
        level.as_u8() >= MIN_LEVEL
    }

    /// Record one log event.
    ///
    /// Captures the timestamp, clamps `line`, copies the arguments, and
    /// enqueues. Returns `false` only when the ring was full and the record
    /// was dropped; never blocks, never allocates.
    #[inline(always)]
    pub fn log(
        &self,
        level: Level,
        file: &'static str,
        line: u32,
        format: &'static str,
        args: &[LogArg],
    ) -> bool {
        if !self.enabled(level) {
            return true;
        }
        self.ring
            .try_push(LogRecord::new(level, file, line, format, args))
            .is_ok()
    }
}

impl<const MIN_LEVEL: u8> Clone for Logger<MIN_LEVEL> {
    fn clone(&self) -> Self {
        Logger {
            ring: Arc::clone(&self.ring),
        }
    }
}
