// Rotation scenarios: file count, record-boundary packing, truncate-on-close

use anyhow::Result;
use rapidlog::{Consumer, Level, LogArg, Logger, MpscRing};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

// Rendered line: "[INFO]" (6) + timestamp (18) + "t.rs:1 " (7) +
// "seq=" (4) + 4-digit counter (4) + 24 dashes + "\n" (1) = 64 bytes
const FMT: &str = "seq=%------------------------";
const LINE_LEN: usize = 64;

fn scratch_dir(prefix: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/rapidlog_{prefix}_{}", Uuid::new_v4()))
}

fn log_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| Ok(entry?.path()))
        .collect::<Result<Vec<_>>>()?;
    files.sort_by_key(|p| {
        p.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.rsplit('_').next())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(u64::MAX)
    });
    Ok(files)
}

#[test]
fn test_rotation_produces_ceil_b_over_s_files() -> Result<()> {
    let dir = scratch_dir("rotation");
    let ring = Arc::new(MpscRing::with_capacity(256)?);
    let logger: Logger = Logger::new(Arc::clone(&ring));

    // 160 uniform 64-byte renderings published up front: B = 10240 bytes
    for seq in 0..160 {
        assert!(logger.log(Level::Info, "t.rs", 1, FMT, &[LogArg::Int(1000 + seq)]));
    }

    let mut consumer = Consumer::new(ring, &dir, 4096);
    consumer.start();
    let written = consumer.stop();
    assert_eq!(written, 160);

    // ceil(10240 / 4096) = 3 files; 64 lines pack each 4096-byte file exactly
    let files = log_files(&dir)?;
    assert_eq!(files.len(), 3);
    assert_eq!(fs::metadata(&files[0])?.len(), 4096);
    assert_eq!(fs::metadata(&files[1])?.len(), 4096);
    assert_eq!(fs::metadata(&files[2])?.len(), 2048);

    // Concatenated contents equal the serial rendering in consumer order,
    // and every file ends at a record boundary
    let mut output = String::new();
    for file in &files {
        let content = fs::read_to_string(file)?;
        assert_eq!(content.len() % LINE_LEN, 0, "{} splits a record", file.display());
        output.push_str(&content);
    }

    let mut expected = 1000;
    for line in output.lines() {
        assert_eq!(line.len(), LINE_LEN - 1);
        assert!(line.starts_with("[INFO]"), "line: {line}");
        assert!(line.contains(&format!("seq={expected}")), "line: {line}");
        expected += 1;
    }
    assert_eq!(expected, 1160);

    fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn test_last_file_truncated_to_bytes_written() -> Result<()> {
    let dir = scratch_dir("truncate");
    let ring = Arc::new(MpscRing::with_capacity(16)?);
    let logger: Logger = Logger::new(Arc::clone(&ring));

    for seq in 0..3 {
        assert!(logger.log(Level::Info, "t.rs", 1, FMT, &[LogArg::Int(1000 + seq)]));
    }

    let mut consumer = Consumer::new(ring, &dir, 64 * 1024);
    consumer.start();
    assert_eq!(consumer.stop(), 3);

    // The file was created at 64 KiB but holds exactly three renderings
    let files = log_files(&dir)?;
    assert_eq!(files.len(), 1);
    assert_eq!(
        fs::metadata(&files[0])?.len() as usize,
        3 * LINE_LEN,
        "on-disk size equals total bytes written"
    );

    fs::remove_dir_all(&dir)?;
    Ok(())
}
