// SPDX-License-Identifier: Apache-2.0 OR MIT
// Memory-mapped rotating file writer
//
// Owned by the single consumer thread; no synchronization. Each file is
// created at the target size, mapped MAP_SHARED, filled by memcpy, and
// truncated to the bytes actually written when it is closed.

use chrono::Local;
use nix::sys::mman::{mmap, msync, munmap, MapFlags, MsFlags, ProtFlags};
use nix::unistd::ftruncate;
use std::fs::{self, File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::ptr::NonNull;
use thiserror::Error;

/// Errors raised by the writer
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("failed to open log file '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("write of {len} bytes failed: {reason}")]
    WriteFailed { len: usize, reason: String },

    #[error("span of {len} bytes exceeds the {file_size}-byte target file size")]
    OversizedSpan { len: usize, file_size: usize },
}

/// Appends byte spans into a memory-mapped file, rotating on overflow.
///
/// Files are named `YYYY-MM-DD_<idx>.log` inside the configured directory,
/// with `idx` counting up from 0 across rotations. At most one file is
/// mapped at a time.
pub struct MmapWriter {
    dir: PathBuf,
    file_size: usize,
    index: u64,
    file: Option<File>,
    map: Option<NonNull<libc::c_void>>,
    write_offset: usize,
}

// SAFETY: the mapping pointer is used only by the thread that owns the
// writer; MmapWriter is moved into the consumer thread, never shared.
unsafe impl Send for MmapWriter {}

impl MmapWriter {
    /// Configure a writer; no file is touched until [`open`](Self::open)
    pub fn new(dir: impl Into<PathBuf>, file_size: usize) -> Self {
        MmapWriter {
            dir: dir.into(),
            file_size,
            index: 0,
            file: None,
            map: None,
            write_offset: 0,
        }
    }

    /// Create, extend, and map the next log file.
    ///
    /// Any failure leaves the writer closed and reports `OpenFailed`.
    pub fn open(&mut self) -> Result<(), WriterError> {
        self.close();

        let path = self.next_path();
        let open_failed = |reason: String| WriterError::OpenFailed {
            path: path.clone(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|e| open_failed(e.to_string()))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| open_failed(e.to_string()))?;

        ftruncate(&file, self.file_size as i64).map_err(|e| open_failed(e.to_string()))?;

        let length = NonZeroUsize::new(self.file_size)
            .ok_or_else(|| open_failed("target file size must be nonzero".to_string()))?;
        let map = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                &file,
                0,
            )
        }
        .map_err(|e| open_failed(e.to_string()))?;

        self.file = Some(file);
        self.map = Some(map);
        self.write_offset = 0;
        self.index += 1;
        Ok(())
    }

    /// Append a span, rotating to the next file if it would overflow.
    ///
    /// A span longer than the target file size can never fit in one file and
    /// fails with `OversizedSpan` (this implementation fails oversized spans
    /// rather than truncating them).
    pub fn write(&mut self, span: &[u8]) -> Result<(), WriterError> {
        if span.is_empty() {
            return Ok(());
        }
        if span.len() > self.file_size {
            return Err(WriterError::OversizedSpan {
                len: span.len(),
                file_size: self.file_size,
            });
        }
        if self.map.is_some() && self.write_offset + span.len() > self.file_size {
            self.open()?;
        }
        let map = match self.map {
            Some(map) => map,
            None => {
                return Err(WriterError::WriteFailed {
                    len: span.len(),
                    reason: "writer is closed".to_string(),
                })
            }
        };

        // SAFETY: the mapping is file_size bytes long and write_offset + len
        // was just checked against file_size; the region is exclusively ours.
        unsafe {
            std::ptr::copy_nonoverlapping(
                span.as_ptr(),
                (map.as_ptr() as *mut u8).add(self.write_offset),
                span.len(),
            );
        }
        self.write_offset += span.len();
        Ok(())
    }

    /// Request an asynchronous page-sync; no durability guarantee on return
    pub fn flush(&mut self) {
        if let Some(map) = self.map {
            if self.write_offset > 0 {
                // SAFETY: map covers file_size bytes starting at a page
                // boundary; write_offset never exceeds file_size.
                unsafe {
                    let _ = msync(map, self.write_offset, MsFlags::MS_ASYNC);
                }
            }
        }
    }

    /// Sync, truncate to the bytes actually written, unmap, and close.
    ///
    /// Idempotent; also runs on drop.
    pub fn close(&mut self) {
        if let Some(map) = self.map.take() {
            // SAFETY: map/file_size describe the live mapping; nothing
            // touches the mapping after munmap.
            unsafe {
                let _ = msync(map, self.file_size, MsFlags::MS_SYNC);
            }
            if let Some(file) = &self.file {
                // Tail zeros from the ftruncate extension are not persisted
                let _ = ftruncate(file, self.write_offset as i64);
            }
            unsafe {
                let _ = munmap(map, self.file_size);
            }
        }
        self.file = None;
        self.write_offset = 0;
    }

    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Bytes written into the current file
    pub fn position(&self) -> usize {
        self.write_offset
    }

    /// Bytes still available in the current file (0 when closed)
    pub fn remaining(&self) -> usize {
        if self.map.is_some() {
            self.file_size - self.write_offset
        } else {
            0
        }
    }

    /// Index the next `open` will use; files are numbered from 0
    pub fn file_index(&self) -> u64 {
        self.index
    }

    fn next_path(&self) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d");
        self.dir.join(format!("{}_{}.log", date, self.index))
    }
}

impl Drop for MmapWriter {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    fn scratch_dir() -> PathBuf {
        PathBuf::from(format!("/tmp/rapidlog_writer_{}", Uuid::new_v4()))
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        // Names are <date>_<idx>.log; sort by the numeric index
        files.sort_by_key(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.rsplit('_').next())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(u64::MAX)
        });
        files
    }

    #[test]
    fn test_open_creates_dated_indexed_file() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 4096);
        writer.open().unwrap();
        assert!(writer.is_open());
        assert_eq!(writer.position(), 0);
        assert_eq!(writer.remaining(), 4096);
        writer.close();

        let files = log_files(&dir);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with("_0.log"), "unexpected name {name}");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_close_truncates_to_written_length() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 4096);
        writer.open().unwrap();
        writer.write(b"hello mmap\n").unwrap();
        writer.close();

        let files = log_files(&dir);
        assert_eq!(fs::metadata(&files[0]).unwrap().len(), 11);
        assert_eq!(fs::read(&files[0]).unwrap(), b"hello mmap\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 4096);
        writer.open().unwrap();
        writer.write(b"once").unwrap();
        writer.close();
        writer.close();
        assert!(!writer.is_open());

        let files = log_files(&dir);
        assert_eq!(fs::metadata(&files[0]).unwrap().len(), 4);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rotation_on_overflow() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 8);
        writer.open().unwrap();
        writer.write(b"12345678").unwrap();
        // Next span does not fit: the writer rotates to file index 1
        writer.write(b"abcd").unwrap();
        writer.close();

        let files = log_files(&dir);
        assert_eq!(files.len(), 2);
        assert_eq!(fs::read(&files[0]).unwrap(), b"12345678");
        assert_eq!(fs::read(&files[1]).unwrap(), b"abcd");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_oversized_span_fails() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 8);
        writer.open().unwrap();
        let result = writer.write(b"123456789");
        assert!(matches!(
            result,
            Err(WriterError::OversizedSpan { len: 9, file_size: 8 })
        ));
        // The current file is untouched
        assert_eq!(writer.position(), 0);
        writer.close();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_write_on_closed_writer_fails() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 64);
        let result = writer.write(b"data");
        assert!(matches!(result, Err(WriterError::WriteFailed { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_flush_while_open() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 64);
        writer.open().unwrap();
        writer.write(b"flushed").unwrap();
        writer.flush();
        assert_eq!(writer.position(), 7);
        writer.close();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_reopen_increments_index() {
        let dir = scratch_dir();
        let mut writer = MmapWriter::new(&dir, 16);
        writer.open().unwrap();
        writer.write(b"first").unwrap();
        writer.open().unwrap();
        writer.write(b"second").unwrap();
        writer.close();

        let files = log_files(&dir);
        assert_eq!(files.len(), 2);
        // The explicit reopen closed file 0, truncating it to its content
        assert_eq!(fs::read(&files[0]).unwrap(), b"first");
        assert_eq!(fs::read(&files[1]).unwrap(), b"second");

        let _ = fs::remove_dir_all(&dir);
    }
}
