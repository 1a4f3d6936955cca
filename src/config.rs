// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Construction-time configuration for the logging pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Options fixed at construction time.
///
/// The compile-time minimum level is a const parameter of
/// [`Logger`](crate::Logger) / [`LogSystem`](crate::LogSystem), not part of
/// this struct: level filtering is resolved at compile time and is not
/// reconfigurable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Ring capacity in records; must be a nonzero power of two
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Directory the rotating log files are created in
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Target size of each mapped log file, in bytes
    #[serde(default = "default_file_size")]
    pub file_size: usize,
}

fn default_capacity() -> usize {
    8192
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_size() -> usize {
    32 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Config {
            capacity: default_capacity(),
            log_dir: default_log_dir(),
            file_size: default_file_size(),
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::CapacityZero);
        }
        if !self.capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(self.capacity));
        }
        if self.file_size == 0 {
            return Err(ConfigError::FileSizeZero);
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(ConfigError::LogDirEmpty);
        }
        Ok(())
    }
}

/// Errors detected when the pipeline is constructed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ring capacity must be nonzero")]
    CapacityZero,

    #[error("ring capacity must be a power of two, got {0}")]
    CapacityNotPowerOfTwo(usize),

    #[error("target file size must be nonzero")]
    FileSizeZero,

    #[error("log directory must not be empty")]
    LogDirEmpty,
}
