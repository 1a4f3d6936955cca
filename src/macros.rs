// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros: capture source location, convert arguments, and skip
// everything when the level is compiled out

/// Log at [`Level::Info`](crate::Level::Info).
///
/// Captures the current file basename and line. Arguments are not evaluated
/// when the logger's compile-time threshold filters the level out. Returns
/// `false` only when the ring was full and the record was dropped.
///
/// # Examples
/// ```ignore
/// log_info!(logger, "connected to % on port %", host, 8080);
/// ```
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        if logger.enabled($crate::Level::Info) {
            logger.log(
                $crate::Level::Info,
                $crate::record::basename(file!()),
                line!(),
                $fmt,
                &[$($crate::LogArg::from($arg)),*],
            )
        } else {
            true
        }
    }};
}

/// Log at [`Level::Warning`](crate::Level::Warning).
///
/// # Examples
/// ```ignore
/// log_warning!(logger, "queue depth % above high-water mark", depth);
/// ```
#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        if logger.enabled($crate::Level::Warning) {
            logger.log(
                $crate::Level::Warning,
                $crate::record::basename(file!()),
                line!(),
                $fmt,
                &[$($crate::LogArg::from($arg)),*],
            )
        } else {
            true
        }
    }};
}

/// Log at [`Level::Error`](crate::Level::Error).
///
/// # Examples
/// ```ignore
/// log_error!(logger, "write failed after % retries", retries);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {{
        let logger = &$logger;
        if logger.enabled($crate::Level::Error) {
            logger.log(
                $crate::Level::Error,
                $crate::record::basename(file!()),
                line!(),
                $fmt,
                &[$($crate::LogArg::from($arg)),*],
            )
        } else {
            true
        }
    }};
}
