// Log levels with a total order for threshold filtering

use serde::{Deserialize, Serialize};

/// Log level (higher is more severe)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Informational (normal operation)
    Info = 0,
    /// Warning conditions (approaching limits, degraded behavior)
    Warning = 1,
    /// Error conditions (operation failed)
    Error = 2,
}

impl Level {
    /// Get level as u8 (0-2)
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get level name as static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    /// Bracketed form emitted at the start of each rendered line
    pub const fn tag(self) -> &'static str {
        match self {
            Level::Info => "[INFO]",
            Level::Warning => "[WARNING]",
            Level::Error => "[ERROR]",
        }
    }

    /// Create from u8 value (returns None if invalid)
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Level::Info),
            1 => Some(Level::Warning),
            2 => Some(Level::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
