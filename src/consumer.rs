// Log consumer thread - drains the ring, formats records, and feeds the
// memory-mapped writer

use crate::record::{LogArg, LogRecord};
use crate::ring::{CacheAligned, MpscRing};
use crate::staging::{self, StagingBuffer};
use crate::writer::{MmapWriter, WriterError};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Empty-drain polls before the consumer briefly sleeps
const SPIN_BUDGET: u32 = 50;
/// Idle back-off between polls once the spin budget is spent
const IDLE_SLEEP: Duration = Duration::from_millis(1);
/// Staging headroom required before a record is rendered
const RECORD_HEADROOM: usize = 256;

/// The background half of the pipeline.
///
/// `start` spawns the single consumer thread; `stop` signals it, joins, and
/// returns the number of records written since `start`. Producers keep
/// their [`Logger`](crate::Logger) handles; the consumer owns the staging
/// buffer and the writer exclusively.
pub struct Consumer {
    ring: Arc<MpscRing>,
    log_dir: PathBuf,
    file_size: usize,
    running: Arc<CacheAligned<AtomicBool>>,
    handle: Option<thread::JoinHandle<u64>>,
}

impl Consumer {
    pub fn new(ring: Arc<MpscRing>, log_dir: impl Into<PathBuf>, file_size: usize) -> Self {
        Consumer {
            ring,
            log_dir: log_dir.into(),
            file_size,
            running: Arc::new(CacheAligned(AtomicBool::new(false))),
            handle: None,
        }
    }

    /// Spawn the consumer thread; no-op if already started
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.running.0.store(true, Ordering::Release);

        let ring = Arc::clone(&self.ring);
        let running = Arc::clone(&self.running);
        let mut pipeline = Pipeline::new(MmapWriter::new(&self.log_dir, self.file_size));
        self.handle = Some(thread::spawn(move || pipeline.run(&ring, &running.0)));
    }

    /// Signal shutdown, join the consumer, and return the number of records
    /// written since `start`.
    ///
    /// Records already published to the ring are drained before the thread
    /// exits; records a producer had reserved but not yet published are lost.
    pub fn stop(&mut self) -> u64 {
        self.running.0.store(false, Ordering::Release);
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

/// State owned by the consumer thread
struct Pipeline {
    writer: MmapWriter,
    staging: StagingBuffer,
    time_cache: TimeCache,
    writer_ok: bool,
    oversized_noted: bool,
    write_errors: u64,
    written: u64,
}

impl Pipeline {
    fn new(writer: MmapWriter) -> Self {
        Pipeline {
            writer,
            staging: StagingBuffer::with_capacity(staging::DEFAULT_CAPACITY),
            time_cache: TimeCache::new(),
            writer_ok: false,
            oversized_noted: false,
            write_errors: 0,
            written: 0,
        }
    }

    fn run(&mut self, ring: &MpscRing, running: &AtomicBool) -> u64 {
        self.writer_ok = match self.writer.open() {
            Ok(()) => true,
            Err(err) => {
                // Keep draining so producers never back up; output is lost
                eprintln!("rapidlog: {err}; log output disabled");
                false
            }
        };

        let mut idle_spins = 0u32;
        while running.load(Ordering::Acquire) {
            let view = ring.drain();
            if view.is_empty() {
                drop(view);
                if idle_spins < SPIN_BUDGET {
                    idle_spins += 1;
                    continue;
                }
                idle_spins = 0;
                thread::sleep(IDLE_SLEEP);
                continue;
            }
            idle_spins = 0;
            for record in view.iter() {
                self.format_record(record);
                self.written += 1;
            }
        }

        // Shutdown: drain whatever was published before the flag flipped
        loop {
            let view = ring.drain();
            if view.is_empty() {
                break;
            }
            for record in view.iter() {
                self.format_record(record);
                self.written += 1;
            }
        }

        self.flush_staging();
        self.writer.close();
        self.written
    }

    /// Render one record into the staging buffer, flushing as needed.
    ///
    /// Line shape: `[LEVEL]MM-DD HH:MM:SS.sssfile:line body\n`.
    fn format_record(&mut self, record: &LogRecord) {
        if !self.staging.has_space(RECORD_HEADROOM) {
            self.flush_staging();
        }
        let start = self.staging.len();

        self.staging.append(record.level.tag().as_bytes());
        let stamp = self.time_cache.text_for(record.timestamp_ns);
        self.staging.append(stamp.as_bytes());
        self.staging.append(record.file.as_bytes());
        self.staging.push(b':');
        self.staging.append_int(i64::from(record.line));
        self.staging.push(b' ');
        self.append_body(record);
        self.staging.push(b'\n');

        // Keep files record-aligned: once the staged bytes no longer fit the
        // current file, push out the complete records before this one so the
        // eventual rotation never splits a record
        if self.writer_ok && start > 0 && self.staging.len() > self.writer.remaining() {
            self.write_out(start);
        }
    }

    /// Substitute `%` placeholders left to right while arguments remain;
    /// leftover placeholders stay literal, leftover arguments are dropped
    fn append_body(&mut self, record: &LogRecord) {
        let format = record.format.as_bytes();
        let args = record.args();
        let mut arg_index = 0;
        let mut literal_start = 0;

        for (i, &byte) in format.iter().enumerate() {
            if byte != b'%' || arg_index >= args.len() {
                continue;
            }
            self.staging.append(&format[literal_start..i]);
            match args[arg_index] {
                LogArg::Int(value) => self.staging.append_int(i64::from(value)),
                LogArg::Float(value) => self.staging.append_f64(value),
                LogArg::Str(value) => self.staging.append(value.as_bytes()),
            }
            arg_index += 1;
            literal_start = i + 1;
        }
        self.staging.append(&format[literal_start..]);
    }

    fn flush_staging(&mut self) {
        let len = self.staging.len();
        self.write_out(len);
    }

    /// Hand the first `len` staged bytes to the writer and drop them
    fn write_out(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        if self.writer_ok {
            if let Err(err) = self.writer.write(&self.staging.as_slice()[..len]) {
                self.note_write_error(err);
            }
        }
        self.staging.consume(len);
    }

    fn note_write_error(&mut self, err: WriterError) {
        match err {
            WriterError::OpenFailed { .. } => {
                eprintln!("rapidlog: {err}; log output disabled");
                self.writer_ok = false;
            }
            WriterError::OversizedSpan { .. } => {
                if !self.oversized_noted {
                    eprintln!("rapidlog: {err}");
                    self.oversized_noted = true;
                }
            }
            WriterError::WriteFailed { .. } => {
                self.write_errors += 1;
                if self.write_errors.is_power_of_two() {
                    eprintln!("rapidlog: {err} ({} failures so far)", self.write_errors);
                }
            }
        }
    }
}

/// Cached `MM-DD HH:MM:SS.sss` formatter.
///
/// Local-time conversion runs only when the millisecond changes; reusing the
/// cached text must not change output, only cost. Single-threaded by
/// construction (the consumer owns it).
struct TimeCache {
    cached_ms: i64,
    text: String,
}

impl TimeCache {
    fn new() -> Self {
        TimeCache {
            cached_ms: i64::MIN,
            text: String::new(),
        }
    }

    fn text_for(&mut self, timestamp_ns: u64) -> &str {
        let ms = (timestamp_ns / 1_000_000) as i64;
        if ms != self.cached_ms {
            self.refresh(ms);
        }
        &self.text
    }

    fn refresh(&mut self, ms: i64) {
        let secs = ms.div_euclid(1000);
        let millis = ms.rem_euclid(1000);
        self.text.clear();
        match DateTime::from_timestamp(secs, 0) {
            Some(utc) => {
                let local = utc.with_timezone(&Local);
                let _ = write!(
                    self.text,
                    "{}.{millis:03}",
                    local.format("%m-%d %H:%M:%S")
                );
            }
            None => {
                let _ = write!(self.text, "??-?? ??:??:??.{millis:03}");
            }
        }
        self.cached_ms = ms;
    }
}
