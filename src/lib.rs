// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Lock-free asynchronous logging with rotating memory-mapped output.
//!
//! Producer threads enqueue compact, allocation-free records into a bounded
//! MPSC ring; a single background consumer drains the ring, renders records
//! to text through a staging buffer, and writes them into memory-mapped
//! files that rotate at a configured size.
//!
//! Producers never block: when the ring is full the record is dropped and
//! the call reports it. Level filtering is a compile-time parameter of
//! [`Logger`]/[`LogSystem`]; calls below the threshold compile to nothing.
//!
//! ```no_run
//! use rapidlog::{log_error, log_info, Config, LogSystem};
//!
//! let system: LogSystem = LogSystem::start(Config::default())?;
//!
//! let logger = system.logger();
//! std::thread::spawn(move || {
//!     log_info!(logger, "worker % handled % requests", 3, 1250);
//! });
//!
//! let logger = system.logger();
//! log_error!(logger, "backend % unreachable", "replica-2");
//!
//! let written = system.stop();
//! # Ok::<(), rapidlog::ConfigError>(())
//! ```

pub mod config;
pub mod consumer;
pub mod level;
pub mod logger;
#[macro_use]
mod macros;
pub mod record;
pub mod ring;
pub mod staging;
pub mod system;
pub mod writer;

// Public exports
pub use config::{Config, ConfigError};
pub use consumer::Consumer;
pub use level::Level;
pub use logger::Logger;
pub use record::{LogArg, LogRecord, MAX_ARGS};
pub use ring::{DrainView, MpscRing, QueueFull};
pub use staging::StagingBuffer;
pub use system::LogSystem;
pub use writer::{MmapWriter, WriterError};
