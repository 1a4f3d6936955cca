// Convenience wiring: ring construction and consumer lifecycle behind one
// handle

use crate::config::{Config, ConfigError};
use crate::consumer::Consumer;
use crate::logger::Logger;
use crate::ring::MpscRing;
use std::sync::Arc;

/// Owns the ring and the consumer thread.
///
/// `start` validates the configuration, builds the ring, and spawns the
/// consumer; `logger` hands out producer handles; `stop` shuts the pipeline
/// down and reports how many records were written.
///
/// ```no_run
/// use rapidlog::{log_info, Config, LogSystem};
///
/// let system: LogSystem = LogSystem::start(Config::default())?;
/// let logger = system.logger();
/// log_info!(logger, "started with % workers", 4);
/// let written = system.stop();
/// # Ok::<(), rapidlog::ConfigError>(())
/// ```
pub struct LogSystem<const MIN_LEVEL: u8 = 0> {
    ring: Arc<MpscRing>,
    consumer: Consumer,
}

impl<const MIN_LEVEL: u8> LogSystem<MIN_LEVEL> {
    /// Validate the configuration, build the pipeline, and spawn the
    /// consumer thread
    pub fn start(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let ring = Arc::new(MpscRing::with_capacity(config.capacity)?);
        let mut consumer = Consumer::new(Arc::clone(&ring), config.log_dir, config.file_size);
        consumer.start();
        Ok(LogSystem { ring, consumer })
    }

    /// A producer handle sharing this system's ring
    pub fn logger(&self) -> Logger<MIN_LEVEL> {
        Logger::new(Arc::clone(&self.ring))
    }

    /// Shut down: drain published records, join the consumer, close the
    /// writer. Returns the number of records written since `start`.
    pub fn stop(mut self) -> u64 {
        self.consumer.stop()
    }
}
